//! Customer- and admin-facing texts, rendered as Telegram HTML.
//!
//! Shared by the bot and by the API server's admin notifications, so both
//! surfaces word things the same way.

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;

use crate::booking::Booking;
use crate::catalog::{Catalog, ServiceDefinition};

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━";

// ── Formatting helpers ──

/// Escape text for Telegram's HTML parse mode.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn format_price(price: Decimal) -> String {
    format!("${price}")
}

/// `09:30 AM`
pub fn format_time_12h(t: NaiveTime) -> String {
    t.format("%I:%M %p").to_string()
}

/// `Mon, Mar 02`, used on date buttons.
pub fn format_day_short(day: NaiveDate) -> String {
    day.format("%a, %b %d").to_string()
}

/// `Monday, March 02`
pub fn format_day_long(day: NaiveDate) -> String {
    day.format("%A, %B %d").to_string()
}

/// `Mar 02, 2026`
pub fn format_day_list(day: NaiveDate) -> String {
    day.format("%b %d, %Y").to_string()
}

// ── Booking conversation ──

pub fn welcome(business_name: &str) -> String {
    format!(
        "💈 <b>Welcome to {}!</b>\n\n\
         Book your appointment in 3 easy steps:\n\
         1️⃣ Enter your details\n\
         2️⃣ Choose service &amp; time\n\
         3️⃣ Confirm booking\n\n\
         👇 What would you like to do?",
        escape_html(business_name)
    )
}

pub fn welcome_back() -> &'static str {
    "💈 <b>Welcome Back!</b>\n\nWhat would you like to do?"
}

pub fn ask_name() -> &'static str {
    "✨ <b>Let's Book Your Appointment!</b>\n\n\
     Step 1 of 3\n\n\
     👤 Please type your <b>full name</b>:"
}

pub fn ask_phone(name: &str) -> String {
    format!(
        "Nice to meet you, {}! 👋\n\n\
         Step 2 of 3\n\n\
         📱 Please enter your <b>phone number</b>:\n\
         (Example: +1234567890 or 1234567890)",
        escape_html(name)
    )
}

pub fn ask_service() -> &'static str {
    "Perfect! 📞\n\nStep 3 of 3\n\n💇 <b>Choose Your Service:</b>"
}

/// Menu button label: `Haircut - $25 (30min)`.
pub fn service_button(service: &ServiceDefinition) -> String {
    format!(
        "{} - {} ({}min)",
        service.display_name,
        format_price(service.price),
        service.duration_min
    )
}

pub fn ask_date(service: &ServiceDefinition) -> String {
    format!(
        "Great choice! ✨\n\n\
         Service: <b>{}</b>\n\
         Duration: {} minutes\n\
         Price: {}\n\n\
         📅 <b>Select a Date:</b>",
        escape_html(&service.display_name),
        service.duration_min,
        format_price(service.price)
    )
}

pub fn ask_time(day: NaiveDate) -> String {
    format!(
        "📅 Date: <b>{}</b>\n\n🕐 <b>Select a Time:</b>",
        format_day_long(day)
    )
}

pub fn no_slots() -> &'static str {
    "😔 Sorry, no slots available on this date.\n\nPlease use /start to try another date."
}

pub fn slot_taken(day: NaiveDate) -> String {
    format!(
        "⚠️ Sorry, that time was just taken.\n\n\
         📅 Date: <b>{}</b>\n\n🕐 <b>Please pick another time:</b>",
        format_day_long(day)
    )
}

pub fn cancelled() -> &'static str {
    "❌ Cancelled. Use /start to begin again."
}

/// Card shown to the customer once the booking is stored.
pub fn confirmation(booking: &Booking, catalog: &Catalog, business_name: &str, address: &str) -> String {
    let price = catalog
        .get(&booking.service_key)
        .map(|s| format!("💵 Price: {}\n", format_price(s.price)))
        .unwrap_or_default();

    format!(
        "✅ <b>Booking Confirmed!</b>\n\n\
         {RULE}\n\
         🎫 Booking ID: <b>#{}</b>\n\
         👤 Name: {}\n\
         📱 Phone: {}\n\
         💇 Service: {}\n\
         {}\
         📅 Date: {}\n\
         🕐 Time: {}\n\
         {RULE}\n\n\
         📍 {} - {}\n\n\
         See you soon! ✨\n\n\
         Use /start to manage bookings.",
        booking.id,
        escape_html(&booking.customer_name),
        escape_html(&booking.customer_phone),
        escape_html(catalog.display_name(&booking.service_key)),
        price,
        booking.day.format("%A, %B %d, %Y"),
        format_time_12h(booking.start_time),
        escape_html(business_name),
        escape_html(address),
    )
}

pub fn admin_new_booking(booking: &Booking, catalog: &Catalog) -> String {
    let price = catalog
        .get(&booking.service_key)
        .map(|s| format!("\nPrice: {}", format_price(s.price)))
        .unwrap_or_default();

    format!(
        "🔔 <b>New Booking!</b>\n\n\
         ID: #{}\n\
         Customer: {}\n\
         Phone: {}\n\
         Service: {}\n\
         Date: {}\n\
         Time: {}{}",
        booking.id,
        escape_html(&booking.customer_name),
        escape_html(&booking.customer_phone),
        escape_html(catalog.display_name(&booking.service_key)),
        booking.day.format("%A, %B %d, %Y"),
        format_time_12h(booking.start_time),
        price,
    )
}

// ── Lists ──

pub fn my_bookings(bookings: &[Booking], catalog: &Catalog) -> String {
    if bookings.is_empty() {
        return "📭 <b>No Bookings Found</b>\n\nYou don't have any upcoming appointments.".into();
    }

    let mut text = "📋 <b>Your Bookings</b>\n\n".to_string();
    for b in bookings {
        text.push_str(&format!(
            "🎫 ID: #{}\n📅 {} at {}\n💇 {}\n\n",
            b.id,
            format_day_list(b.day),
            format_time_12h(b.start_time),
            escape_html(catalog.display_name(&b.service_key)),
        ));
    }
    text
}

/// Admin view of one day. `label` is e.g. `Today` or `Tomorrow`.
pub fn day_schedule(label: &str, bookings: &[Booking], catalog: &Catalog) -> String {
    if bookings.is_empty() {
        return format!("📭 <b>No Bookings {label}</b>");
    }

    let mut text = format!("📊 <b>{label}'s Bookings</b> ({} total)\n\n", bookings.len());
    for b in bookings {
        text.push_str(&format!(
            "🕐 {}\n👤 {}\n📱 {}\n💇 {}\nID: #{}\n\n",
            format_time_12h(b.start_time),
            escape_html(&b.customer_name),
            escape_html(&b.customer_phone),
            escape_html(catalog.display_name(&b.service_key)),
            b.id,
        ));
    }

    let total: Decimal = bookings
        .iter()
        .filter_map(|b| catalog.get(&b.service_key))
        .map(|s| s.price)
        .sum();
    text.push_str(&format!("{RULE}\n💰 Total: <b>{}</b>", format_price(total)));
    text
}

/// Full upcoming schedule sent to a forwarding target.
pub fn forward_schedule(bookings: &[Booking], catalog: &Catalog) -> String {
    let mut text = format!("📋 <b>All Upcoming Bookings</b> ({} total)\n\n", bookings.len());
    for b in bookings {
        text.push_str(&format!(
            "🎫 ID: #{}\n📅 {} at {}\n👤 {}\n📱 {}\n💇 {}\n\n",
            b.id,
            format_day_list(b.day),
            format_time_12h(b.start_time),
            escape_html(&b.customer_name),
            escape_html(&b.customer_phone),
            escape_html(catalog.display_name(&b.service_key)),
        ));
    }
    text
}

pub fn forward_done(count: usize, target: i64) -> String {
    format!(
        "✅ <b>Forwarded Successfully!</b>\n\n\
         Sent {count} bookings to user ID: {target}\n\n\
         Use /start to return to menu."
    )
}

// ── Reminders ──

pub fn reminder(booking: &Booking, catalog: &Catalog, business_name: &str, address: &str) -> String {
    format!(
        "⏰ <b>Reminder</b>\n\n\
         Tomorrow you have an appointment at <b>{}</b>:\n\n\
         💇 {}\n\
         🕐 {} at {}\n\
         📍 {}\n\n\
         See you soon! ✨",
        escape_html(business_name),
        escape_html(catalog.display_name(&booking.service_key)),
        format_day_long(booking.day),
        format_time_12h(booking.start_time),
        escape_html(address),
    )
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::BookingStatus;

    fn booking(id: i64, service: &str, time: &str) -> Booking {
        let day = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        Booking {
            id,
            customer_id: 7,
            customer_name: "Ann <Lee>".into(),
            customer_phone: "+15550001111".into(),
            service_key: service.into(),
            day,
            start_time: NaiveTime::parse_from_str(time, "%H:%M").unwrap(),
            status: BookingStatus::Confirmed,
            created_at: day.and_hms_opt(8, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a<b>&c"), "a&lt;b&gt;&amp;c");
    }

    #[test]
    fn test_time_12h() {
        let t = NaiveTime::from_hms_opt(9, 30, 0).unwrap();
        assert_eq!(format_time_12h(t), "09:30 AM");
        let t = NaiveTime::from_hms_opt(17, 0, 0).unwrap();
        assert_eq!(format_time_12h(t), "05:00 PM");
    }

    #[test]
    fn test_day_formats() {
        let d = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        assert_eq!(format_day_short(d), "Mon, Mar 02");
        assert_eq!(format_day_long(d), "Monday, March 02");
        assert_eq!(format_day_list(d), "Mar 02, 2026");
    }

    #[test]
    fn test_service_button() {
        let catalog = Catalog::default();
        let label = service_button(catalog.get("color").unwrap());
        assert_eq!(label, "Hair Color - $80 (90min)");
    }

    #[test]
    fn test_confirmation_card() {
        let text = confirmation(&booking(12, "haircut", "10:30"), &Catalog::default(), "Anthony Studio", "123 Main St");
        assert!(text.contains("#12"));
        assert!(text.contains("Ann &lt;Lee&gt;"));
        assert!(text.contains("Haircut"));
        assert!(text.contains("$25"));
        assert!(text.contains("Monday, March 02, 2026"));
        assert!(text.contains("10:30 AM"));
        assert!(text.contains("Anthony Studio - 123 Main St"));
    }

    #[test]
    fn test_confirmation_unknown_service_has_no_price() {
        let text = confirmation(&booking(1, "perm", "10:30"), &Catalog::default(), "S", "A");
        assert!(text.contains("Service: perm"));
        assert!(!text.contains("Price"));
    }

    #[test]
    fn test_my_bookings_empty() {
        assert!(my_bookings(&[], &Catalog::default()).contains("No Bookings Found"));
    }

    #[test]
    fn test_day_schedule_totals() {
        let catalog = Catalog::default();
        let list = [booking(1, "haircut", "09:00"), booking(2, "color", "10:00")];
        let text = day_schedule("Today", &list, &catalog);
        assert!(text.contains("Today's Bookings</b> (2 total)"));
        assert!(text.contains("Total: <b>$105</b>"));
        assert_eq!(day_schedule("Tomorrow", &[], &catalog), "📭 <b>No Bookings Tomorrow</b>");
    }

    #[test]
    fn test_forward_schedule_lists_everyone() {
        let list = [booking(1, "beard", "09:00"), booking(2, "style", "11:00")];
        let text = forward_schedule(&list, &Catalog::default());
        assert!(text.contains("(2 total)"));
        assert!(text.contains("Beard Trim"));
        assert!(text.contains("Wash &amp; Style"));
        assert!(text.contains("Mar 02, 2026 at 11:00 AM"));
    }
}
