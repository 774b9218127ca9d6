//! Text rendering of protocol snapshots

use std::fmt::Write;

use sarco_core::{Address, ResourceId, Timestamp, NEVER};
use sarco_protocol::{
    MemoryLedger, ProtocolEvent, ProtocolState, ResourceState, Sarcophagus, TokenLedger,
};

/// Format a Unix timestamp as UTC
pub fn format_timestamp(t: Timestamp) -> String {
    if t == NEVER {
        return "never".to_string();
    }
    i64::try_from(t)
        .ok()
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// One-word status of a resource
pub fn resource_status(resource: &Sarcophagus) -> &'static str {
    if resource.is_compromised {
        "Compromised"
    } else if resource.is_cleaned {
        "Cleaned"
    } else if resource.resurrection_time == NEVER {
        "Buried"
    } else if resource.state == ResourceState::Active {
        "Active"
    } else {
        "Done"
    }
}

pub fn render_status(state: &ProtocolState, ledger: &MemoryLedger) -> String {
    let config = state.config();
    let resources: Vec<&Sarcophagus> = state.resources().collect();
    let active = resources.iter().filter(|r| r.is_live()).count();
    let custody_balance = ledger.balance_of(&state.custody());

    let mut out = String::new();
    let _ = writeln!(out, "\n=== Sarcophagus Protocol Status ===\n");
    let _ = writeln!(out, "Admin:              {}", config.admin);
    let _ = writeln!(out, "Custody:            {}", state.custody());
    let _ = writeln!(out, "Custodians:         {}", state.custodians().count());
    let _ = writeln!(out, "Resources:          {} ({} active)", resources.len(), active);
    let _ = writeln!(out, "Protocol fees:      {}", state.total_protocol_fees());
    let _ = writeln!(out, "Events:             {}", state.events().len());
    let _ = writeln!(out, "Custody balance:    {}", custody_balance);
    match state.liabilities() {
        Ok(liabilities) => {
            let _ = writeln!(out, "Custody owes:       {}", liabilities);
            if liabilities != custody_balance {
                let _ = writeln!(out, "\n⚠️  Custody balance does not match liabilities");
            }
        }
        Err(e) => {
            let _ = writeln!(out, "Custody owes:       ({})", e);
        }
    }
    let _ = writeln!(out, "\nConfiguration:");
    let _ = writeln!(out, "  Protocol fee:     {}%", config.protocol_fee_base_percentage);
    let _ = writeln!(out, "  Cursed bond:      {}%", config.cursed_bond_percentage);
    let _ = writeln!(out, "  Grace period:     {}s", config.grace_period);
    let _ = writeln!(out, "  Claim window:     {}s", config.embalmer_claim_window);
    let _ = writeln!(out, "  Expiration:       {}s", config.expiration_threshold);
    let _ = writeln!(
        out,
        "  Rewrap horizon:   {}/{} x max interval",
        config.rewrap_horizon_numerator, config.rewrap_horizon_denominator
    );
    out
}

pub fn render_resource(state: &ProtocolState, id: &ResourceId) -> Option<String> {
    let resource = state.resource(id)?;

    let mut out = String::new();
    let _ = writeln!(out, "\n=== Resource {} ===\n", resource.id.short());
    let _ = writeln!(out, "Id:               {}", resource.id);
    let _ = writeln!(out, "Name:             {}", resource.name);
    let _ = writeln!(out, "Payload:          {}", resource.payload_ref);
    let _ = writeln!(out, "Status:           {}", resource_status(resource));
    let _ = writeln!(out, "Reveal mode:      {}", resource.reveal_mode);
    let _ = writeln!(out, "Embalmer:         {}", resource.embalmer);
    let _ = writeln!(out, "Recipient:        {}", resource.recipient);
    let _ = writeln!(out, "Created:          {}", format_timestamp(resource.creation_time));
    let _ = writeln!(out, "Last rewrap:      {}", format_timestamp(resource.previous_rewrap_time));
    let _ = writeln!(out, "Resurrection:     {}", format_timestamp(resource.resurrection_time));
    let _ = writeln!(
        out,
        "Threshold:        {} of {}",
        resource.threshold,
        resource.custodians.len()
    );
    let _ = writeln!(out, "\nCustodians:");
    for record in state.bonded_records(id) {
        let status = if record.is_accused {
            "accused"
        } else if record.has_published {
            "published"
        } else {
            "bonded"
        };
        let _ = writeln!(
            out,
            "  {} | {} | fee {}/s + {} | bond {} | {}",
            record.custodian.short(),
            record.commitment.short(),
            record.fee_per_second,
            record.curse_fee,
            record.cursed_bond,
            status
        );
    }
    Some(out)
}

pub fn render_custodian(state: &ProtocolState, address: &Address) -> Option<String> {
    let profile = state.custodian(address)?;

    let mut out = String::new();
    let _ = writeln!(out, "\n=== Custodian {} ===\n", address.short());
    let _ = writeln!(out, "Address:          {}", address);
    let _ = writeln!(out, "Peer id:          {}", profile.peer_id);
    let _ = writeln!(out, "Minimum fee:      {}/s", profile.minimum_fee_per_second);
    let _ = writeln!(out, "Curse fee:        {}", profile.curse_fee);
    let _ = writeln!(out, "Max interval:     {}s", profile.maximum_allowed_interval);
    let _ = writeln!(
        out,
        "Max resurrection: {}",
        format_timestamp(profile.maximum_allowed_resurrection_timestamp)
    );
    let _ = writeln!(out, "Free bond:        {}", profile.free_bond);
    let _ = writeln!(out, "Cursed bond:      {}", profile.cursed_bond);
    let _ = writeln!(out, "Rewards:          {}", profile.accrued_rewards);
    let _ = writeln!(
        out,
        "Record:           {} published, {} accused, {} cleaned",
        profile.successes, profile.accusals, profile.cleanups
    );
    let resources = state.resources_by_custodian(address);
    if !resources.is_empty() {
        let _ = writeln!(out, "\nResources:");
        for id in resources {
            let _ = writeln!(out, "  {}", id);
        }
    }
    Some(out)
}

/// One line per resource, oldest first
pub fn render_resource_list<'a>(resources: impl IntoIterator<Item = &'a Sarcophagus>) -> String {
    let mut resources: Vec<&Sarcophagus> = resources.into_iter().collect();
    if resources.is_empty() {
        return "No resources.".to_string();
    }
    resources.sort_by_key(|r| (r.creation_time, r.id));

    let mut out = String::new();
    for resource in resources {
        let _ = writeln!(
            out,
            "{} | {} | {} | {}-of-{} | {}",
            resource.id.short(),
            resource.name,
            resource_status(resource),
            resource.threshold,
            resource.custodians.len(),
            format_timestamp(resource.resurrection_time)
        );
    }
    out
}

/// The last `limit` events, optionally only those about `resource`
pub fn render_events(events: &[ProtocolEvent], limit: usize, resource: Option<ResourceId>) -> String {
    let selected: Vec<(usize, &ProtocolEvent)> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| resource.is_none() || e.resource() == resource)
        .collect();
    if selected.is_empty() {
        return "No events.".to_string();
    }

    let skip = selected.len().saturating_sub(limit);
    let mut out = String::new();
    for (index, event) in selected.into_iter().skip(skip) {
        let detail = serde_json::to_string(event).unwrap_or_default();
        let _ = writeln!(out, "#{:<5} {:<24} {}", index, event.name(), detail);
    }
    out
}
