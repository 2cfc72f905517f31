use clap::builder::styling::{AnsiColor, Color, Style};
use clap::builder::Styles;
use crossterm::style::{Attribute, Stylize};

use crate::runner::RunReport;

// ═══════════════════════════════════════════════════════════════════════════════
// Clap Styles
// ═══════════════════════════════════════════════════════════════════════════════

pub fn get_styles() -> Styles {
    clap::builder::Styles::styled()
        .usage(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Cyan))),
        )
        .header(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Cyan))),
        )
        .literal(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Green))),
        )
        .invalid(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
        )
        .error(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
        )
        .valid(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Green))),
        )
        .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack))))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Palette
// ═══════════════════════════════════════════════════════════════════════════════

pub mod colors {
    use crossterm::style::Color;

    pub const CYAN: Color = Color::Rgb {
        r: 0,
        g: 255,
        b: 255,
    };
    pub const PURPLE: Color = Color::Rgb {
        r: 180,
        g: 100,
        b: 255,
    };
    pub const GREEN: Color = Color::Rgb {
        r: 0,
        g: 255,
        b: 136,
    };
    pub const ORANGE: Color = Color::Rgb {
        r: 255,
        g: 165,
        b: 0,
    };
    pub const RED: Color = Color::Rgb {
        r: 255,
        g: 85,
        b: 85,
    };
    pub const DIM: Color = Color::Rgb {
        r: 128,
        g: 128,
        b: 128,
    };
    pub const WHITE: Color = Color::Rgb {
        r: 255,
        g: 255,
        b: 255,
    };
}

pub mod box_chars {
    pub const SINGLE_HORIZONTAL: &str = "─";
    pub const ROUND_TOP_LEFT: &str = "╭";
    pub const ROUND_TOP_RIGHT: &str = "╮";
    pub const ROUND_BOTTOM_LEFT: &str = "╰";
    pub const ROUND_BOTTOM_RIGHT: &str = "╯";
    pub const ARROW_RIGHT: &str = "▶";
    pub const BULLET: &str = "●";
    pub const CHECK: &str = "✓";
    pub const CROSS_MARK: &str = "✗";
}

const SECTION_WIDTH: usize = 60;

// ═══════════════════════════════════════════════════════════════════════════════
// Status Indicators
// ═══════════════════════════════════════════════════════════════════════════════

pub fn print_success(message: &str) {
    println!(
        " {} {}",
        box_chars::CHECK.to_string().with(colors::GREEN).bold(),
        message.with(colors::GREEN)
    );
}

pub fn print_error(message: &str) {
    eprintln!(
        " {} {}",
        box_chars::CROSS_MARK.to_string().with(colors::RED).bold(),
        message.with(colors::RED)
    );
}

pub fn print_warning(message: &str) {
    println!(
        " {} {}",
        "⚠".with(colors::ORANGE).bold(),
        message.with(colors::ORANGE)
    );
}

// ═══════════════════════════════════════════════════════════════════════════════
// Sections
// ═══════════════════════════════════════════════════════════════════════════════

pub fn print_section_header(title: &str) {
    let title_len = title.chars().count();
    let padding = SECTION_WIDTH.saturating_sub(title_len + 4) / 2;

    println!();
    print!("{}", box_chars::ROUND_TOP_LEFT.with(colors::CYAN));
    print!(
        "{}",
        box_chars::SINGLE_HORIZONTAL
            .repeat(padding)
            .with(colors::CYAN)
    );
    print!(
        " {} ",
        title.with(colors::CYAN).bold().attribute(Attribute::Italic)
    );
    print!(
        "{}",
        box_chars::SINGLE_HORIZONTAL
            .repeat(SECTION_WIDTH.saturating_sub(title_len + 4 + padding))
            .with(colors::CYAN)
    );
    println!("{}", box_chars::ROUND_TOP_RIGHT.with(colors::CYAN));
}

pub fn print_section_footer() {
    print!("{}", box_chars::ROUND_BOTTOM_LEFT.with(colors::CYAN));
    print!(
        "{}",
        box_chars::SINGLE_HORIZONTAL
            .repeat(SECTION_WIDTH)
            .with(colors::CYAN)
    );
    println!("{}", box_chars::ROUND_BOTTOM_RIGHT.with(colors::CYAN));
    println!();
}

pub fn print_key_value(key: &str, value: &str) {
    println!(
        "  {} {} {}",
        box_chars::BULLET.with(colors::PURPLE),
        format!("{}:", key).with(colors::DIM),
        value.with(colors::WHITE)
    );
}

pub fn print_list_item(item: &str, indent: usize) {
    let indent_str = "  ".repeat(indent);
    println!(
        "{}{}  {}",
        indent_str,
        box_chars::ARROW_RIGHT.with(colors::ORANGE),
        item.with(colors::WHITE)
    );
}

// ═══════════════════════════════════════════════════════════════════════════════
// Batch Summary
// ═══════════════════════════════════════════════════════════════════════════════

/// One-line plain summary of a batch.
pub fn summary_line(report: &RunReport) -> String {
    format!(
        "Done: {} of {} saved ({} failed). {}",
        report.saved(),
        report.records,
        report.failed(),
        report.counters
    )
}

pub fn print_summary(report: &RunReport) {
    let c = &report.counters;

    print_section_header("Summary");
    print_key_value("Input", &report.input.display().to_string());
    print_key_value(
        "Records",
        &format!("{} ({} skipped)", report.records, report.skipped),
    );
    print_key_value("Audio", &format!("{} ok / {} failed", c.audio_ok, c.audio_fail));
    print_key_value(
        "Cover",
        &format!(
            "{} ok / {} failed ({} retries, {} repaired)",
            c.cover_ok, c.cover_fail, c.cover_retries, c.cover_repaired
        ),
    );

    let failed: Vec<_> = report.results.iter().filter(|r| !r.succeeded()).collect();
    if !failed.is_empty() {
        println!();
        for result in &failed {
            print_list_item(&format!("{} ({})", result.title, result.id), 1);
        }
    }
    print_section_footer();

    if failed.is_empty() {
        print_success(&summary_line(report));
    } else {
        print_warning(&summary_line(report));
    }
}
