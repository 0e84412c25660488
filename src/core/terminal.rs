use console::{Emoji, style};

pub static SUCCESS_ICON: Emoji<'_, '_> = Emoji("✅ ", "");
pub static INFO_ICON: Emoji<'_, '_> = Emoji("ℹ️  ", "");
pub static WARN_ICON: Emoji<'_, '_> = Emoji("⚠️  ", "");
pub static ERROR_ICON: Emoji<'_, '_> = Emoji("❌ ", "");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "");
pub static GEAR: Emoji<'_, '_> = Emoji("⚙️  ", "");

pub fn print_success(msg: &str) {
    println!("{} {}", SUCCESS_ICON, style(msg).green());
}

pub fn print_info(msg: &str) {
    println!("{} {}", INFO_ICON, style(msg).blue());
}

pub fn print_warn(msg: &str) {
    println!("{} {}", WARN_ICON, style(msg).yellow());
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", ERROR_ICON, style(msg).red().bold());
}

pub fn print_status(label: &str, msg: &str) {
    println!("  {} {}: {}", GEAR, style(label).bold().cyan(), msg);
}

pub fn print_launch(msg: &str) {
    println!("{} {}", ROCKET, style(msg).bold());
}

/// A titled block of aligned rows: commands in help output, key/value
/// pairs in detail views.
pub struct GuideSection {
    title: String,
    rows: Vec<Row>,
}

enum Row {
    Command(String, String),
    Status(String, String),
    Blank,
}

impl GuideSection {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            rows: Vec::new(),
        }
    }

    pub fn command(mut self, name: &str, about: &str) -> Self {
        self.rows
            .push(Row::Command(name.to_string(), about.to_string()));
        self
    }

    pub fn status(mut self, label: &str, value: &str) -> Self {
        self.rows
            .push(Row::Status(label.to_string(), value.to_string()));
        self
    }

    pub fn blank(mut self) -> Self {
        self.rows.push(Row::Blank);
        self
    }

    pub fn print(&self) {
        let width = self
            .rows
            .iter()
            .map(|row| match row {
                Row::Command(name, _) | Row::Status(name, _) => name.chars().count(),
                Row::Blank => 0,
            })
            .max()
            .unwrap_or(0);

        println!("\n {}", style(&self.title).bold().underlined());
        for row in &self.rows {
            match row {
                Row::Command(name, about) => {
                    println!("   {:<width$}  {}", style(name).green(), about, width = width)
                }
                Row::Status(label, value) => {
                    println!("   {:<width$}  {}", style(label).cyan(), value, width = width)
                }
                Row::Blank => println!(),
            }
        }
    }
}

pub fn print_banner() {
    println!();
    println!(
        "{}",
        style(" taskcrew ").bold().black().on_cyan()
    );
    println!(
        "{}\n",
        style("Role agents that plan, build and keep the receipts.").cyan()
    );
}

/// Single-line preview for tables: first line only, cut to `max` chars.
pub fn preview(text: &str, max: usize) -> String {
    let first = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("").trim();
    if first.chars().count() <= max {
        first.to_string()
    } else {
        let cut: String = first.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}
