use crate::model::MatchResult;

/// One exportable column of a result row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportColumn {
    Category,
    LedgerIds,
    StatementIds,
    Confidence,
    DeltaMinor,
    TextScore,
    DateScore,
    AmountScore,
}

impl ExportColumn {
    pub const ALL: [ExportColumn; 8] = [
        ExportColumn::Category,
        ExportColumn::LedgerIds,
        ExportColumn::StatementIds,
        ExportColumn::Confidence,
        ExportColumn::DeltaMinor,
        ExportColumn::TextScore,
        ExportColumn::DateScore,
        ExportColumn::AmountScore,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::LedgerIds => "ledger_ids",
            Self::StatementIds => "statement_ids",
            Self::Confidence => "confidence",
            Self::DeltaMinor => "delta_minor",
            Self::TextScore => "text_score",
            Self::DateScore => "date_score",
            Self::AmountScore => "amount_score",
        }
    }

    /// Parse a column name as written in an export spec. Unknown names
    /// come back as `Err` carrying the offending token.
    pub fn parse(name: &str) -> Result<Self, String> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.name() == name.trim())
            .ok_or_else(|| name.trim().to_string())
    }
}

/// Projects results onto a caller-chosen column order. Id lists are
/// joined with `;` so a row stays one line in any tabular sink.
#[derive(Debug)]
pub struct ExportOrderer {
    columns: Vec<ExportColumn>,
}

impl ExportOrderer {
    pub fn new(columns: Vec<ExportColumn>) -> Self {
        Self { columns }
    }

    /// Comma-separated column list, e.g. `category,confidence`.
    pub fn from_spec(spec: &str) -> Result<Self, String> {
        let columns = spec
            .split(',')
            .map(ExportColumn::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(columns))
    }

    pub fn header(&self) -> Vec<&'static str> {
        self.columns.iter().map(ExportColumn::name).collect()
    }

    pub fn row(&self, result: &MatchResult) -> Vec<String> {
        self.columns
            .iter()
            .map(|column| match column {
                ExportColumn::Category => result.category.to_string(),
                ExportColumn::LedgerIds => result.ledger_ids.join(";"),
                ExportColumn::StatementIds => result.statement_ids.join(";"),
                ExportColumn::Confidence => format!("{:.4}", result.confidence),
                ExportColumn::DeltaMinor => result
                    .delta_minor
                    .map(|d| d.to_string())
                    .unwrap_or_default(),
                ExportColumn::TextScore => score_part(result, |p| p.text),
                ExportColumn::DateScore => score_part(result, |p| p.date),
                ExportColumn::AmountScore => score_part(result, |p| p.amount),
            })
            .collect()
    }
}

impl Default for ExportOrderer {
    fn default() -> Self {
        Self::new(ExportColumn::ALL.to_vec())
    }
}

fn score_part(result: &MatchResult, pick: impl Fn(&crate::model::ScoreParts) -> f64) -> String {
    result
        .score_parts
        .as_ref()
        .map(|p| format!("{:.4}", pick(p)))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, ScoreParts};

    fn fuzzy_result() -> MatchResult {
        MatchResult {
            category: Category::FuzzyMatched,
            ledger_ids: vec!["L1".into()],
            statement_ids: vec!["S1".into(), "S2".into()],
            confidence: 0.875,
            score_parts: Some(ScoreParts {
                text: 0.9,
                date: 0.5,
                amount: 1.0,
            }),
            delta_minor: Some(-50),
        }
    }

    #[test]
    fn default_order_covers_every_column() {
        let orderer = ExportOrderer::default();
        assert_eq!(orderer.header().len(), 8);
        assert_eq!(orderer.row(&fuzzy_result()).len(), 8);
    }

    #[test]
    fn caller_order_is_respected() {
        let orderer = ExportOrderer::from_spec("confidence,category").unwrap();
        assert_eq!(orderer.header(), vec!["confidence", "category"]);
        assert_eq!(
            orderer.row(&fuzzy_result()),
            vec!["0.8750".to_string(), "fuzzy_matched".to_string()]
        );
    }

    #[test]
    fn id_lists_are_semicolon_joined() {
        let orderer = ExportOrderer::from_spec("statement_ids").unwrap();
        assert_eq!(orderer.row(&fuzzy_result()), vec!["S1;S2".to_string()]);
    }

    #[test]
    fn absent_optionals_render_empty() {
        let result = MatchResult {
            category: Category::UnmatchedLedger,
            ledger_ids: vec!["L9".into()],
            statement_ids: Vec::new(),
            confidence: 0.0,
            score_parts: None,
            delta_minor: None,
        };
        let orderer = ExportOrderer::from_spec("delta_minor,text_score").unwrap();
        assert_eq!(orderer.row(&result), vec![String::new(), String::new()]);
    }

    #[test]
    fn unknown_column_is_reported_by_name() {
        let err = ExportOrderer::from_spec("category,severity").unwrap_err();
        assert_eq!(err, "severity");
    }

    #[test]
    fn spec_tolerates_spaces() {
        let orderer = ExportOrderer::from_spec("category, confidence").unwrap();
        assert_eq!(orderer.header(), vec!["category", "confidence"]);
    }
}
