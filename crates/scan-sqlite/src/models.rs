use serde::Serialize;
use std::fmt;
use std::ops::AddAssign;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Table {
    Locations,
    Hosts,
    Services,
    Apps,
    ServicesApps,
    Vulns,
    ServicesVulns,
}

impl Table {
    pub const ALL: [Table; 7] = [
        Table::Locations,
        Table::Hosts,
        Table::Services,
        Table::Apps,
        Table::ServicesApps,
        Table::Vulns,
        Table::ServicesVulns,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Table::Locations => "locations",
            Table::Hosts => "hosts",
            Table::Services => "services",
            Table::Apps => "apps",
            Table::ServicesApps => "services_apps",
            Table::Vulns => "vulns",
            Table::ServicesVulns => "services_vulns",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// Uniqueness conflict: the row is already present and left untouched.
    AlreadyExists,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub inserted: u64,
    pub already_exists: u64,
}

impl LoadReport {
    pub fn record(&mut self, outcome: InsertOutcome) {
        match outcome {
            InsertOutcome::Inserted => self.inserted += 1,
            InsertOutcome::AlreadyExists => self.already_exists += 1,
        }
    }

    pub fn statements(&self) -> u64 { self.inserted + self.already_exists }
}

impl AddAssign for LoadReport {
    fn add_assign(&mut self, rhs: Self) {
        self.inserted += rhs.inserted;
        self.already_exists += rhs.already_exists;
    }
}
