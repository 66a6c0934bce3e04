use ferry_transfer::{BatchReport, RemoteObject, TransferOutcome};
use tabled::settings::{Panel, Style};
use tabled::{Table, Tabled};

#[derive(Debug, Clone, Default)]
pub struct Formatter {
    pub header: Option<String>,
    pub footer: Option<String>,
}

impl Formatter {
    pub fn build<T: Tabled, I: IntoIterator<Item = T>>(self, data: I) -> Table {
        let mut table = Table::new(data);
        if let Some(header) = self.header {
            table.with(Panel::header(header));
        }
        if let Some(footer) = self.footer {
            table.with(Panel::footer(footer));
        }
        table.with(Style::blank());
        table
    }
}

#[derive(Tabled)]
struct OutcomeRow {
    target: String,
    status: &'static str,
    detail: String,
}

/// One row per item, in batch order, with a count summary underneath.
pub fn outcome_table(report: &BatchReport) -> Table {
    let rows = report.results.iter().map(|result| match &result.outcome {
        TransferOutcome::Success(location) => OutcomeRow {
            target: result.target.clone(),
            status: "ok",
            detail: location.clone(),
        },
        TransferOutcome::Failure(failure) => OutcomeRow {
            target: result.target.clone(),
            status: "FAILED",
            detail: failure.to_string(),
        },
    });

    Formatter {
        header: None,
        footer: Some(format!(
            "{}: {} succeeded, {} failed, {} of {} bytes",
            report.direction,
            report.succeeded(),
            report.failed(),
            report.bytes_seen,
            report.total_bytes
        )),
    }
    .build(rows)
}

#[derive(Tabled)]
struct ObjectRow {
    key:  String,
    size: u64,
}

pub fn object_table(objects: &[RemoteObject]) -> Table {
    let rows = objects.iter().map(|object| ObjectRow {
        key:  object.key.clone(),
        size: object.size,
    });
    Formatter {
        header: None,
        footer: Some(format!("{} objects", objects.len())),
    }
    .build(rows)
}
