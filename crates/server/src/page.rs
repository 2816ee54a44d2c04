//! Server-rendered HTML for the single management page.

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use shared::domain::{MenuItem, Reservation, DATE_FORMAT, MAX_GUESTS, MIN_GUESTS, TIME_FORMAT};

pub(crate) const TITLE: &str = "Menu & Reservation Manager";

/// Part of the page a notice is shown in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Section {
    Menu,
    Booking,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NoticeKind {
    Success,
    Error,
    Info,
}

impl NoticeKind {
    fn css_class(self) -> &'static str {
        match self {
            NoticeKind::Success => "notice success",
            NoticeKind::Error => "notice error",
            NoticeKind::Info => "notice info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Notice {
    pub(crate) section: Section,
    pub(crate) kind: NoticeKind,
    pub(crate) message: String,
}

impl Notice {
    pub(crate) fn success(section: Section, message: impl Into<String>) -> Self {
        Self::new(section, NoticeKind::Success, message)
    }

    pub(crate) fn error(section: Section, message: impl Into<String>) -> Self {
        Self::new(section, NoticeKind::Error, message)
    }

    pub(crate) fn info(section: Section, message: impl Into<String>) -> Self {
        Self::new(section, NoticeKind::Info, message)
    }

    fn new(section: Section, kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            section,
            kind,
            message: message.into(),
        }
    }
}

pub(crate) struct PageModel<'a> {
    pub(crate) menu: &'a [MenuItem],
    pub(crate) reservations: &'a [Reservation],
    pub(crate) names: &'a [String],
    pub(crate) notice: Option<&'a Notice>,
    pub(crate) today: NaiveDate,
    pub(crate) now: NaiveTime,
}

const STYLE: &str = "\
body{font-family:sans-serif;margin:0;display:flex;min-height:100vh}\
aside{width:18rem;padding:1rem;background:#f0f2f6}\
main{flex:1;padding:1rem 2rem}\
label{display:block;margin:.5rem 0 .2rem}\
table{border-collapse:collapse;width:100%}\
th,td{border:1px solid #ddd;padding:.3rem .6rem;text-align:left}\
.notice{padding:.5rem;border-radius:.3rem;margin:.5rem 0}\
.success{background:#d4edda}.error{background:#f8d7da}.info{background:#d1ecf1}";

pub(crate) fn render_page(model: &PageModel<'_>) -> String {
    let mut html = String::new();
    html.push_str(&head());
    html.push_str("<body>");
    html.push_str(&sidebar(model));
    html.push_str("<main>");
    html.push_str(&format!("<h1>{}</h1>", escape(TITLE)));
    html.push_str(&menu_section(model.menu));
    html.push_str(&booking_section(model));
    html.push_str(&reservations_section(model));
    html.push_str("</main></body></html>");
    html
}

/// Shown when the stores cannot be read; the page cannot be built.
pub(crate) fn render_error_page(message: &str) -> String {
    format!(
        "{}<body><main><h1>{}</h1><div class=\"notice error\">{}</div></main></body></html>",
        head(),
        escape(TITLE),
        escape(message)
    )
}

fn head() -> String {
    format!(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\">\
         <title>{}</title><style>{STYLE}</style></head>",
        escape(TITLE)
    )
}

fn sidebar(model: &PageModel<'_>) -> String {
    format!(
        "<aside><h2>Edit Menu</h2>\
         <form method=\"post\" action=\"/menu\">\
         <label for=\"item\">New Item</label>\
         <input id=\"item\" name=\"item\" type=\"text\">\
         <label for=\"price\">Price ($)</label>\
         <input id=\"price\" name=\"price\" type=\"number\" min=\"0\" step=\"0.01\" value=\"0.00\">\
         <p><button type=\"submit\">Add to Menu</button></p>\
         </form>{}</aside>",
        notice_for(model.notice, Section::Menu)
    )
}

fn menu_section(menu: &[MenuItem]) -> String {
    let mut html = String::from("<h2>Current Menu</h2>");
    if menu.is_empty() {
        html.push_str(&info_box("Menu is empty. Add items from the sidebar."));
        return html;
    }

    html.push_str("<table><thead><tr><th>Item</th><th>Price</th></tr></thead><tbody>");
    for entry in menu {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td></tr>",
            escape(&entry.item),
            format_price(entry.price)
        ));
    }
    html.push_str("</tbody></table>");
    html
}

fn booking_section(model: &PageModel<'_>) -> String {
    format!(
        "<h2>Make a Reservation</h2>\
         <form method=\"post\" action=\"/reservations\">\
         <label for=\"name\">Name</label>\
         <input id=\"name\" name=\"name\" type=\"text\">\
         <label for=\"guests\">Number of Guests</label>\
         <input id=\"guests\" name=\"guests\" type=\"number\" min=\"{MIN_GUESTS}\" max=\"{MAX_GUESTS}\" step=\"1\" value=\"{MIN_GUESTS}\">\
         <label for=\"date\">Date</label>\
         <input id=\"date\" name=\"date\" type=\"date\" value=\"{}\">\
         <label for=\"time\">Time</label>\
         <input id=\"time\" name=\"time\" type=\"time\" value=\"{}\">\
         <p><button type=\"submit\">Book Table</button></p>\
         </form>{}",
        model.today.format(DATE_FORMAT),
        model.now.format(TIME_FORMAT),
        notice_for(model.notice, Section::Booking)
    )
}

fn reservations_section(model: &PageModel<'_>) -> String {
    let mut html = String::from("<h2>Current Reservations</h2>");
    let notice = notice_for(model.notice, Section::Cancel);
    if model.reservations.is_empty() {
        html.push_str(&notice);
        html.push_str(&info_box("No reservations yet."));
        return html;
    }

    html.push_str(
        "<form method=\"post\" action=\"/reservations/cancel\">\
         <label for=\"cancel-name\">Select a name to cancel reservation</label>\
         <select id=\"cancel-name\" name=\"name\">",
    );
    for name in model.names {
        let name = escape(name);
        html.push_str(&format!("<option value=\"{name}\">{name}</option>"));
    }
    html.push_str("</select><p><button type=\"submit\">Cancel Reservation</button></p></form>");
    html.push_str(&notice);

    html.push_str(
        "<table><thead><tr><th>Name</th><th>Guests</th><th>Date</th><th>Time</th></tr></thead><tbody>",
    );
    for reservation in model.reservations {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&reservation.name),
            reservation.guests,
            reservation.date.format(DATE_FORMAT),
            reservation.time.format(TIME_FORMAT)
        ));
    }
    html.push_str("</tbody></table>");
    html
}

fn notice_for(notice: Option<&Notice>, section: Section) -> String {
    match notice {
        Some(notice) if notice.section == section => format!(
            "<div class=\"{}\">{}</div>",
            notice.kind.css_class(),
            escape(&notice.message)
        ),
        _ => String::new(),
    }
}

fn info_box(message: &str) -> String {
    format!("<div class=\"notice info\">{}</div>", escape(message))
}

/// Two-decimal display; the stored value is left as entered.
pub(crate) fn format_price(price: Decimal) -> String {
    format!("{:.2}", price.round_dp(2))
}

pub(crate) fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
