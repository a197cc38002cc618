//! Live table model for the connections view.
//!
//! Derives a sorted, column-projected row sequence from a connections
//! snapshot. Sorting is stable and total: the primary key is the selected
//! column, ties always fall back to connection identity, so re-sorting
//! unchanged data never reorders. Column visibility is a pure function of the
//! daemon's capability flags (process attribution, rule groups) derived from
//! the data itself; the memo lives inside the model instance, never in shared
//! module state.

use std::cmp::Ordering;

use crate::fmt::{pretty_bytes, pretty_rate, short_age};
use crate::models::ConnectionRecord;

/// A connection table column. `Id` exists as a sort key only and is never
/// part of the visible projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Id,
    Host,
    Process,
    Download,
    Upload,
    DownloadSpeed,
    UploadSpeed,
    Chains,
    Rule,
    RuleGroup,
    Start,
    Source,
    DestinationIp,
    Type,
}

impl Column {
    pub fn title(&self) -> &'static str {
        match self {
            Column::Id => "Id",
            Column::Host => "Host",
            Column::Process => "Process",
            Column::Download => "DL",
            Column::Upload => "UL",
            Column::DownloadSpeed => "DL Speed",
            Column::UploadSpeed => "UL Speed",
            Column::Chains => "Chains",
            Column::Rule => "Rule",
            Column::RuleGroup => "Rule Group",
            Column::Start => "Time",
            Column::Source => "Source",
            Column::DestinationIp => "Destination IP",
            Column::Type => "Type",
        }
    }

    /// Volume and time columns read better largest/newest first.
    pub fn sort_desc_first(&self) -> bool {
        matches!(
            self,
            Column::Download
                | Column::Upload
                | Column::DownloadSpeed
                | Column::UploadSpeed
                | Column::Start
        )
    }

    /// Render the cell text for one record.
    pub fn render(&self, rec: &ConnectionRecord) -> String {
        match self {
            Column::Id => rec.id.clone(),
            Column::Host => rec.host.clone(),
            Column::Process => rec.process_path.clone().unwrap_or_default(),
            Column::Download => pretty_bytes(rec.download),
            Column::Upload => pretty_bytes(rec.upload),
            Column::DownloadSpeed => pretty_rate(rec.download_speed),
            Column::UploadSpeed => pretty_rate(rec.upload_speed),
            Column::Chains => rec.chains.join(" / "),
            Column::Rule => rec.rule.clone(),
            Column::RuleGroup => rec.rule_group.clone().unwrap_or_default(),
            Column::Start => short_age(&rec.start),
            Column::Source => rec.source.clone(),
            Column::DestinationIp => rec.destination_ip.clone(),
            Column::Type => rec.conn_type.clone(),
        }
    }

    fn compare(&self, a: &ConnectionRecord, b: &ConnectionRecord) -> Ordering {
        match self {
            Column::Id => a.id.cmp(&b.id),
            Column::Host => a.host.cmp(&b.host),
            Column::Process => a.process_path.cmp(&b.process_path),
            Column::Download => a.download.cmp(&b.download),
            Column::Upload => a.upload.cmp(&b.upload),
            Column::DownloadSpeed => a.download_speed.cmp(&b.download_speed),
            Column::UploadSpeed => a.upload_speed.cmp(&b.upload_speed),
            Column::Chains => a.chains.cmp(&b.chains),
            Column::Rule => a.rule.cmp(&b.rule),
            Column::RuleGroup => a.rule_group.cmp(&b.rule_group),
            Column::Start => a.start.cmp(&b.start),
            Column::Source => a.source.cmp(&b.source),
            Column::DestinationIp => a.destination_ip.cmp(&b.destination_ip),
            Column::Type => a.conn_type.cmp(&b.conn_type),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn flip(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// Column key plus direction. Ties are always broken by identity, making the
/// ordering total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub column: Column,
    pub direction: SortDirection,
}

impl Default for SortSpec {
    /// Newest connection first; matches identity order for stability.
    fn default() -> Self {
        SortSpec {
            column: Column::Id,
            direction: SortDirection::Desc,
        }
    }
}

impl SortSpec {
    /// Next spec after the user activates `column`: a new column starts at its
    /// preferred direction, the same column flips.
    pub fn cycle(self, column: Column) -> SortSpec {
        if self.column == column {
            SortSpec {
                column,
                direction: self.direction.flip(),
            }
        } else {
            SortSpec {
                column,
                direction: if column.sort_desc_first() {
                    SortDirection::Desc
                } else {
                    SortDirection::Asc
                },
            }
        }
    }
}

/// Capability flags advertised by the data itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub has_process: bool,
    pub has_rule_group: bool,
}

impl Capabilities {
    /// Derive from a snapshot: a column is available while at least one record
    /// carries the attribute.
    pub fn derive(records: &[ConnectionRecord]) -> Self {
        Capabilities {
            has_process: records.iter().any(|r| r.process_path.is_some()),
            has_rule_group: records.iter().any(|r| r.rule_group.is_some()),
        }
    }
}

/// Pure projection of the capability tuple onto the visible column list.
/// Same input, same output, every time.
pub fn visible_columns(caps: Capabilities) -> Vec<Column> {
    let mut columns = vec![Column::Host];
    if caps.has_process {
        columns.push(Column::Process);
    }
    columns.extend([
        Column::Download,
        Column::Upload,
        Column::DownloadSpeed,
        Column::UploadSpeed,
        Column::Chains,
        Column::Rule,
    ]);
    if caps.has_rule_group {
        columns.push(Column::RuleGroup);
    }
    columns.extend([
        Column::Start,
        Column::Source,
        Column::DestinationIp,
        Column::Type,
    ]);
    columns
}

/// Pure sort of `data` under `spec`: stable, total, identity tie-break.
pub fn sort_rows<'a>(data: &'a [ConnectionRecord], spec: SortSpec) -> Vec<&'a ConnectionRecord> {
    let mut rows: Vec<&ConnectionRecord> = data.iter().collect();
    rows.sort_by(|a, b| {
        let primary = spec.column.compare(a, b);
        let primary = match spec.direction {
            SortDirection::Asc => primary,
            SortDirection::Desc => primary.reverse(),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    });
    rows
}

/// Sort and column state for one mounted connections view.
#[derive(Debug, Default)]
pub struct TableModel {
    caps: Capabilities,
    columns: Vec<Column>,
    sort: SortSpec,
}

impl TableModel {
    pub fn new() -> Self {
        TableModel {
            caps: Capabilities::default(),
            columns: visible_columns(Capabilities::default()),
            sort: SortSpec::default(),
        }
    }

    /// Recompute visible columns when the capability tuple changed. Sort state
    /// for columns that remain visible is untouched; sorting by a column that
    /// just disappeared falls back to the default spec.
    pub fn update_capabilities(&mut self, records: &[ConnectionRecord]) {
        let caps = Capabilities::derive(records);
        if caps == self.caps && !self.columns.is_empty() {
            return;
        }
        self.caps = caps;
        self.columns = visible_columns(caps);
        let sortable = self.sort.column == Column::Id || self.columns.contains(&self.sort.column);
        if !sortable {
            self.sort = SortSpec::default();
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        self.caps
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn sort(&self) -> SortSpec {
        self.sort
    }

    /// Activate sorting on the visible column at `index`.
    pub fn sort_by_index(&mut self, index: usize) {
        if let Some(column) = self.columns.get(index).copied() {
            self.sort = self.sort.cycle(column);
        }
    }

    pub fn rows<'a>(&self, data: &'a [ConnectionRecord]) -> Vec<&'a ConnectionRecord> {
        sort_rows(data, self.sort)
    }
}
