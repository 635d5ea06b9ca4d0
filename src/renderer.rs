//! # Tide Table Rendering
//!
//! Builds the published HTML page. Rendering is pure: the same [`Page`]
//! always produces the same bytes, and nothing here touches the network or
//! the filesystem.
//!
//! The table always has four body rows, since a day has at most four tide
//! extremes. Row *i* pairs today's *i*-th entry with tomorrow's *i*-th entry
//! purely by position; a column that runs out renders `&nbsp;` cells.

use crate::TableEntry;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt;

/// Page title shown in the browser tab
pub const TITLE: &str = "Karekare Tides";

/// Body rows in the table
pub const TABLE_ROWS: usize = 4;

const BLANK_CELL: &str = "<td>&nbsp;</td>";

/// How the column dates are written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LabelStyle {
    /// `Dec 26`, used by the calculator page
    Short,
    /// `2024-12-26`, used by the API page
    Iso,
}

impl LabelStyle {
    pub fn format(self, date: NaiveDate) -> String {
        match self {
            LabelStyle::Short => date.format("%b %d").to_string(),
            LabelStyle::Iso => date.format("%Y-%m-%d").to_string(),
        }
    }
}

/// Everything the page shows.
#[derive(Clone, Debug)]
pub struct Page<'a> {
    pub heading: &'a str,
    pub refresh_url: &'a str,
    pub refresh_secs: u32,
    /// Written into an HTML comment so a stale page can be spotted
    pub generated_at: NaiveDateTime,
    pub today_label: String,
    pub tomorrow_label: String,
    pub today: &'a [TableEntry],
    pub tomorrow: &'a [TableEntry],
}

/// Render the page to a string.
pub fn render_page(page: &Page<'_>) -> String {
    page.to_string()
}

/// 12-hour clock with AM/PM, e.g. `02:07 PM`.
pub fn format_time(time: NaiveTime) -> String {
    time.format("%I:%M %p").to_string()
}

/// Metres to two decimals with an `m` suffix, e.g. `-1.20m`.
pub fn format_height(height_m: f32) -> String {
    format!("{:.2}m", height_m)
}

impl fmt::Display for Page<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "<html>")?;
        writeln!(f, "<head><title>{}</title>", TITLE)?;
        writeln!(f, "  <META HTTP-EQUIV=\"Pragma\" CONTENT=\"no-cache\">")?;
        writeln!(
            f,
            "  <META HTTP-EQUIV=\"Refresh\" CONTENT=\"{};URL={}\">",
            self.refresh_secs,
            escape(self.refresh_url)
        )?;
        writeln!(
            f,
            "  <!-- {} -->",
            self.generated_at.format("%Y-%m-%d %H:%M:%S")
        )?;
        writeln!(f, "</head>")?;
        writeln!(f, "<body>")?;
        writeln!(f, "<h2>{}</h2>", escape(self.heading))?;
        writeln!(f, "  <table cellpadding=5 border=1>")?;
        writeln!(f, "  <tr style=\"background:grey\">")?;
        writeln!(f, "    <th>{}</th>", self.today_label)?;
        writeln!(f, "    <th>Height</th>")?;
        writeln!(f, "    <th>{}</th>", self.tomorrow_label)?;
        writeln!(f, "    <th>Height</th></tr>")?;

        for row in 0..TABLE_ROWS {
            writeln!(f, "  <tr>")?;
            writeln!(f, "    {}", cells(self.today.get(row)))?;
            writeln!(f, "    {}", cells(self.tomorrow.get(row)))?;
            writeln!(f, "  </tr>")?;
        }

        writeln!(f, "  </table>")?;
        writeln!(f, "  <span style=\"font-size: x-small\">")?;
        writeln!(
            f,
            "  Data from the <a href=\"http://www.niwa.co.nz/our-services/online-services/tides\" target=\"_blank\"> National Institute of Water &amp; Atmospheric Research</a><br>"
        )?;
        writeln!(
            f,
            "  Tide heights are given in metres from the mean level of the sea."
        )?;
        writeln!(f, "  </span><br>")?;
        writeln!(f, "  </body>")?;
        writeln!(f, "</html>")
    }
}

/// Time and height cells for one slot.
fn cells(entry: Option<&TableEntry>) -> String {
    let entry = entry.copied().unwrap_or_default();
    let time = match entry.time {
        Some(t) => format!("<td>{}</td>", format_time(t)),
        None => BLANK_CELL.to_string(),
    };
    let height = match entry.height_m {
        Some(h) => format!("<td align=\"right\">{}</td>", format_height(h)),
        None => BLANK_CELL.to_string(),
    };
    format!("{time}{height}")
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(h: u32, m: u32, height_m: f32) -> TableEntry {
        TableEntry {
            time: NaiveTime::from_hms_opt(h, m, 0),
            height_m: Some(height_m),
        }
    }

    fn page<'a>(today: &'a [TableEntry], tomorrow: &'a [TableEntry]) -> Page<'a> {
        Page {
            heading: "Tides for Karekare Beach",
            refresh_url: "/weather/tides.html",
            refresh_secs: 3600,
            generated_at: NaiveDate::from_ymd_opt(2024, 12, 26)
                .unwrap()
                .and_hms_opt(4, 5, 6)
                .unwrap(),
            today_label: LabelStyle::Short.format(NaiveDate::from_ymd_opt(2024, 12, 26).unwrap()),
            tomorrow_label: LabelStyle::Short
                .format(NaiveDate::from_ymd_opt(2024, 12, 27).unwrap()),
            today,
            tomorrow,
        }
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(NaiveTime::from_hms_opt(14, 7, 0).unwrap()), "02:07 PM");
        assert_eq!(format_time(NaiveTime::from_hms_opt(0, 30, 0).unwrap()), "12:30 AM");
        assert_eq!(format_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap()), "12:00 PM");
    }

    #[test]
    fn test_format_height() {
        assert_eq!(format_height(1.4), "1.40m");
        assert_eq!(format_height(-1.25), "-1.25m");
        assert_eq!(format_height(0.0), "0.00m");
    }

    #[test]
    fn test_label_styles() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        assert_eq!(LabelStyle::Short.format(date), "Mar 02");
        assert_eq!(LabelStyle::Iso.format(date), "2024-03-02");
    }

    #[test]
    fn test_header_block() {
        let html = render_page(&page(&[], &[]));
        assert!(html.contains("<title>Karekare Tides</title>"));
        assert!(html.contains("CONTENT=\"no-cache\""));
        assert!(html.contains("CONTENT=\"3600;URL=/weather/tides.html\""));
        assert!(html.contains("<!-- 2024-12-26 04:05:06 -->"));
        assert!(html.contains("<th>Dec 26</th>"));
        assert!(html.contains("<th>Dec 27</th>"));
        assert!(html.contains("mean level of the sea"));
    }

    #[test]
    fn test_always_four_rows() {
        let today = [entry(6, 12, 1.4)];
        let html = render_page(&page(&today, &[]));

        assert_eq!(html.matches("<tr>").count(), TABLE_ROWS);
        // 1 filled slot, 3 empty today slots and 4 empty tomorrow slots
        assert_eq!(html.matches(BLANK_CELL).count(), (3 + 4) * 2);
        assert!(html.contains("<td>06:12 AM</td><td align=\"right\">1.40m</td>"));
    }

    #[test]
    fn test_rows_pair_by_position() {
        let today = [entry(0, 15, -1.2), entry(6, 20, 1.3)];
        let tomorrow = [entry(7, 2, 1.25)];
        let html = render_page(&page(&today, &tomorrow));

        let first_row = "  <tr>\n    <td>12:15 AM</td><td align=\"right\">-1.20m</td>\n    <td>07:02 AM</td><td align=\"right\">1.25m</td>\n  </tr>\n";
        assert!(html.contains(first_row));

        let second_row = format!(
            "  <tr>\n    <td>06:20 AM</td><td align=\"right\">1.30m</td>\n    {BLANK_CELL}{BLANK_CELL}\n  </tr>\n"
        );
        assert!(html.contains(&second_row));
    }

    #[test]
    fn test_extra_entries_are_not_rendered() {
        let today: Vec<_> = (0..5).map(|i| entry(i * 4, 0, 1.0)).collect();
        let html = render_page(&page(&today, &[]));
        assert_eq!(html.matches("<tr>").count(), TABLE_ROWS);
        assert!(!html.contains("04:00 PM"));
    }

    #[test]
    fn test_partial_entry_blanks_only_missing_field() {
        let today = [TableEntry {
            time: NaiveTime::from_hms_opt(19, 5, 0),
            height_m: None,
        }];
        let html = render_page(&page(&today, &[]));
        assert!(html.contains(&format!("<td>07:05 PM</td>{BLANK_CELL}")));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let today = [entry(6, 12, 1.4), entry(12, 20, -1.3)];
        let tomorrow = [entry(7, 1, 1.35)];
        let first = render_page(&page(&today, &tomorrow));
        let second = render_page(&page(&today, &tomorrow));
        assert_eq!(first, second);
    }

    #[test]
    fn test_heading_is_escaped() {
        let mut p = page(&[], &[]);
        p.heading = "Piha & <Karekare>";
        let html = render_page(&p);
        assert!(html.contains("<h2>Piha &amp; &lt;Karekare&gt;</h2>"));
    }
}
