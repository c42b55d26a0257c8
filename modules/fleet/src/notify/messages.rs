//! HTML message bodies for the notification channels

use chrono::NaiveDate;

use crate::models::{Maintenance, Movement, Station, Supplier, Vehicle};
use crate::units::{format_km, format_liters, format_money};

/// Escape text interpolated into Telegram HTML
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

fn short_vehicle(vehicle: &Vehicle) -> String {
    match vehicle.plate.as_deref().filter(|p| !p.trim().is_empty()) {
        Some(plate) => escape_html(plate),
        None => escape_html(&vehicle.name),
    }
}

pub fn refuel_created(movement: &Movement, vehicle: &Vehicle, station: Option<&Station>) -> String {
    let mut lines = vec![
        "⛽ <b>New refuel</b>".to_string(),
        format!("👤 <b>Author:</b> {}", escape_html(&movement.author)),
    ];

    if let Some(editor) = movement.updated_by.as_deref() {
        if editor != movement.author {
            lines.push(format!("🔧 <b>Edited by:</b> {}", escape_html(editor)));
        }
    }

    lines.push(format!(
        "🏪 <b>Station:</b> {}",
        station.map_or_else(|| "N/A".to_string(), |s| escape_html(&s.name))
    ));
    lines.push(format!("🚚 <b>Vehicle:</b> {}", short_vehicle(vehicle)));
    lines.push(format!("📅 <b>Date:</b> {}", movement.date.format("%d/%m/%Y %H:%M")));
    lines.push(format!("🛣️ <b>Km:</b> {} → {}", movement.km_start, movement.km_end));
    lines.push(format!("⛽ <b>Liters:</b> {}", format_liters(movement.liters_centi)));
    lines.push(format!("💶 <b>Price:</b> {}", format_money(movement.price_minor)));

    if let Some(adblue) = movement.adblue_centi {
        lines.push(format!("💧 <b>AdBlue:</b> {} L", format_liters(adblue)));
    }

    if let Some(kml) = movement.km_per_liter {
        lines.push(format!("📊 <b>Ticket average:</b> {:.2} km/L", kml).replace('.', ","));
    }

    if let Some(notes) = movement.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        lines.push(format!("📝 <b>Notes:</b> {}", escape_html(notes)));
    }

    lines.join("\n")
}

pub fn maintenance_created(maintenance: &Maintenance, vehicle: &Vehicle, supplier: &Supplier) -> String {
    let mut lines = vec![
        "🔧 <b>New maintenance</b>".to_string(),
        format!("👤 <b>Author:</b> {}", escape_html(&maintenance.author)),
        format!("🚚 <b>Vehicle:</b> {}", short_vehicle(vehicle)),
        format!("🏪 <b>Supplier:</b> {}", escape_html(&supplier.name)),
        format!("📅 <b>Date:</b> {}", maintenance.date.format("%d/%m/%Y %H:%M")),
        format!("📏 <b>Km at service:</b> {}", format_km(maintenance.km_current)),
        format!("🧾 <b>Invoice:</b> {}", escape_html(&maintenance.invoice_number)),
        format!("💶 <b>Price:</b> {}", format_money(maintenance.price_minor)),
    ];

    if maintenance.km_after > 0 {
        lines.push(format!("🛠️ <b>Next service at:</b> {} km", format_km(maintenance.km_after)));
    }
    if let Some(due) = maintenance.next_maintenance_date {
        lines.push(format!("🗓️ <b>Next service on:</b> {}", due.format("%d/%m/%Y")));
    }
    if !maintenance.notes.trim().is_empty() {
        lines.push(format!("📝 <b>Details:</b> {}", escape_html(&maintenance.notes)));
    }

    lines.join("\n")
}

pub fn credit_low(station_name: &str, balance_minor: i64, threshold_minor: i64) -> String {
    [
        "⚠️ <b>Station credit low</b>".to_string(),
        format!("🏢 <b>Station:</b> {}", escape_html(station_name)),
        format!("💰 <b>Balance:</b> {}", format_money(balance_minor)),
        format!("🔻 <b>Threshold:</b> {}", format_money(threshold_minor)),
    ]
    .join("\n")
}

pub fn credit_added(station_name: &str, balance_minor: i64, threshold_minor: i64) -> String {
    [
        "✅ <b>Station credit topped up</b>".to_string(),
        format!("🏢 <b>Station:</b> {}", escape_html(station_name)),
        format!("💰 <b>Balance:</b> {}", format_money(balance_minor)),
        format!("📈 <b>Threshold:</b> {}", format_money(threshold_minor)),
    ]
    .join("\n")
}

pub fn maintenance_km_due(vehicle: &Vehicle, current_km: i64, km_after: i64, tolerance_km: i64) -> String {
    let remaining = (km_after - current_km).max(0);
    [
        "🚨 <b>MAINTENANCE DUE</b>".to_string(),
        format!("🚚 <b>Vehicle:</b> {}", escape_html(&vehicle.label())),
        format!("📍 <b>Threshold reached:</b> within {} km of the service", format_km(tolerance_km)),
        format!("🧭 <b>Current km:</b> {}", format_km(current_km)),
        format!("🛠️ <b>Next service:</b> {}", format_km(km_after)),
        format!("⏳ <b>Km left:</b> {}", format_km(remaining)),
    ]
    .join("\n")
}

pub fn maintenance_date_due(
    vehicle: &Vehicle,
    due_date: Option<NaiveDate>,
    current_km: i64,
    km_after: i64,
) -> String {
    let mut lines = vec![
        "<b>MAINTENANCE DUE</b>".to_string(),
        format!("<b>Vehicle:</b> {}", escape_html(&vehicle.label())),
        "<b>Reached:</b> next service date".to_string(),
        format!(
            "<b>Next service date:</b> {}",
            due_date.map_or_else(|| "N/A".to_string(), |d| d.format("%d/%m/%Y").to_string())
        ),
        format!("<b>Current km:</b> {}", format_km(current_km)),
    ];

    if km_after > 0 {
        lines.push(format!("<b>Next service (km):</b> {}", format_km(km_after)));
        lines.push(format!("<b>Km left:</b> {}", format_km((km_after - current_km).max(0))));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn vehicle() -> Vehicle {
        Vehicle {
            id: 1,
            name: "Daily".to_string(),
            plate: Some("AB123CD".to_string()),
            color: None,
            current_km: 0,
            maintenance_km: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>A & B</b>"), "&lt;b&gt;A &amp; B&lt;/b&gt;");
    }

    #[test]
    fn test_credit_low_message() {
        let text = credit_low("Central", 440_000, 500_000);
        assert!(text.contains("Central"));
        assert!(text.contains("4.400,00 €"));
        assert!(text.contains("5.000,00 €"));
    }

    #[test]
    fn test_km_due_message_clamps_remaining() {
        let text = maintenance_km_due(&vehicle(), 20_100, 20_000, 500);
        assert!(text.contains("AB123CD - Daily"));
        assert!(text.contains("<b>Km left:</b> 0"));
    }

    #[test]
    fn test_date_due_message_without_km_target() {
        let due = NaiveDate::from_ymd_opt(2026, 3, 1);
        let text = maintenance_date_due(&vehicle(), due, 12_000, 0);
        assert!(text.contains("01/03/2026"));
        assert!(!text.contains("Km left"));
    }
}
