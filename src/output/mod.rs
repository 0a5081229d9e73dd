use crate::adb::protocol::DirEntry;
use crate::types::{Device, DeviceState};
use colored::Colorize;
use comfy_table::Table;
use serde::Serialize;

/// Rows that can be rendered into a table.
pub trait TableFormat {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

/// Single-line machine-friendly rendering.
pub trait PlainFormat {
    fn plain(&self) -> String;
}

pub fn print_table<T: TableFormat>(items: &[T]) {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::NOTHING);
    table.set_header(T::headers());
    for item in items {
        table.add_row(comfy_table::Row::from(item.row()));
    }
    println!("{table}");
}

pub fn print_plain<T: PlainFormat>(items: &[T]) {
    for item in items {
        println!("{}", item.plain());
    }
}

pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("cannot serialize output: {}", e),
    }
}

fn colored_state(state: DeviceState) -> String {
    match state {
        DeviceState::Device => state.to_string().green().to_string(),
        DeviceState::Offline => state.to_string().red().to_string(),
        DeviceState::Unauthorized => state.to_string().yellow().to_string(),
        DeviceState::Unknown => state.to_string(),
    }
}

impl TableFormat for Device {
    fn headers() -> Vec<&'static str> {
        vec!["SERIAL", "STATE", "MODEL", "PRODUCT", "TRANSPORT"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            colored_state(self.state),
            self.model.clone().unwrap_or_default(),
            self.product.clone().unwrap_or_default(),
            self.transport_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
        ]
    }
}

impl PlainFormat for Device {
    fn plain(&self) -> String {
        format!("{}\t{}", self.id, self.state)
    }
}

impl TableFormat for DirEntry {
    fn headers() -> Vec<&'static str> {
        vec!["MODE", "SIZE", "MTIME", "NAME"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.stat.permissions_string(),
            self.stat.size.to_string(),
            self.stat
                .mtime_utc()
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string()),
            if self.stat.is_dir() {
                self.name.blue().to_string()
            } else {
                self.name.clone()
            },
        ]
    }
}

impl PlainFormat for DirEntry {
    fn plain(&self) -> String {
        self.name.clone()
    }
}
