use crate::core::dispatcher::Dispatcher;
use crate::core::source::ContactLoader;
use crate::core::{
    CampaignSummary, ContactTable, MessageTemplate, MessagingGateway, ProgressObserver,
    SpreadsheetSource,
};
use crate::utils::error::{CampaignError, Result};
use rust_decimal::Decimal;
use std::time::Instant;

/// $0.03 per message.
pub const DEFAULT_UNIT_COST: Decimal = Decimal::from_parts(3, 0, 0, false, 2);

/// `rows × unit_cost`, rounded to cents.
pub fn estimate_cost(rows: usize, unit_cost: Decimal) -> Decimal {
    (Decimal::from(rows) * unit_cost).round_dp(2)
}

/// What the operator filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignRequest {
    pub sheet_url: String,
    /// Defaults to the first column of the sheet.
    pub phone_column: Option<String>,
    pub message: String,
}

/// A loaded and checked campaign, ready to launch.
#[derive(Debug, Clone)]
pub struct PreparedCampaign {
    pub table: ContactTable,
    pub phone_column: String,
    pub template: MessageTemplate,
    pub estimated_cost: Decimal,
}

pub struct CampaignEngine<S: SpreadsheetSource, G: MessagingGateway> {
    loader: ContactLoader<S>,
    dispatcher: Dispatcher<G>,
    unit_cost: Decimal,
}

impl<S: SpreadsheetSource, G: MessagingGateway> CampaignEngine<S, G> {
    pub fn new(loader: ContactLoader<S>, dispatcher: Dispatcher<G>) -> Self {
        Self {
            loader,
            dispatcher,
            unit_cost: DEFAULT_UNIT_COST,
        }
    }

    pub fn with_unit_cost(mut self, unit_cost: Decimal) -> Self {
        self.unit_cost = unit_cost;
        self
    }

    pub fn dispatcher(&self) -> &Dispatcher<G> {
        &self.dispatcher
    }

    /// Loads the contacts, picks and normalizes the phone column and prices
    /// the run. Nothing is sent.
    pub async fn prepare(&self, request: &CampaignRequest) -> Result<PreparedCampaign> {
        let template = MessageTemplate::new(request.message.clone())?;
        let mut table = self.loader.load(&request.sheet_url).await?;

        let phone_column = match &request.phone_column {
            Some(column) => column.clone(),
            None => table
                .columns()
                .first()
                .cloned()
                .ok_or(CampaignError::EmptySource)?,
        };
        table.normalize_phone_column(&phone_column)?;

        let estimated_cost = estimate_cost(table.size(), self.unit_cost);
        tracing::info!(
            "Prepared {} messages to column '{}', estimated cost ${}",
            table.size(),
            phone_column,
            estimated_cost
        );

        Ok(PreparedCampaign {
            table,
            phone_column,
            template,
            estimated_cost,
        })
    }

    /// Sends the prepared campaign. Pre-flight errors abort before any send;
    /// per-recipient failures end up in the summary. A crashed gateway yields
    /// [`CampaignError::Aborted`] with the tally so far.
    pub async fn launch(
        &self,
        prepared: &PreparedCampaign,
        observer: &dyn ProgressObserver,
    ) -> Result<CampaignSummary> {
        let dispatch = self.dispatcher.dispatch(
            &prepared.template,
            &prepared.table,
            &prepared.phone_column,
        )?;

        tracing::info!("Launching campaign to {} contacts", dispatch.total());
        let started = Instant::now();

        let summary = dispatch.run(observer).await?;

        tracing::info!(
            "Campaign finished in {:?}: {} sent, {} failed",
            started.elapsed(),
            summary.sent,
            summary.failed
        );
        Ok(summary)
    }

    pub async fn run(
        &self,
        request: &CampaignRequest,
        observer: &dyn ProgressObserver,
    ) -> Result<CampaignSummary> {
        let prepared = self.prepare(request).await?;
        self.launch(&prepared, observer).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ContactRecord, Sheet, SheetRecords, SilentObserver};
    use crate::utils::error::GatewayError;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Clone)]
    struct FixedSheet(SheetRecords);

    #[async_trait]
    impl Sheet for FixedSheet {
        async fn all_records(&self) -> Result<SheetRecords> {
            Ok(self.0.clone())
        }
    }

    #[async_trait]
    impl SpreadsheetSource for FixedSheet {
        type Sheet = FixedSheet;

        async fn open(&self, _identifier: &str) -> Result<FixedSheet> {
            Ok(self.clone())
        }
    }

    #[derive(Clone, Default)]
    struct CountingGateway {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl MessagingGateway for CountingGateway {
        fn is_authenticated(&self) -> bool {
            true
        }

        fn sender(&self) -> Option<&str> {
            Some("+15550000")
        }

        async fn send(
            &self,
            _body: &str,
            _from: &str,
            to: &str,
        ) -> std::result::Result<(), GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if to.starts_with("crash") {
                panic!("gateway client crashed");
            }
            if to.starts_with("bad") {
                return Err(GatewayError::Rejected {
                    code: None,
                    reason: "invalid number".to_string(),
                });
            }
            Ok(())
        }
    }

    fn engine(
        sheet: SheetRecords,
        gateway: CountingGateway,
    ) -> CampaignEngine<FixedSheet, CountingGateway> {
        CampaignEngine::new(
            ContactLoader::new(FixedSheet(sheet)),
            Dispatcher::new(gateway).with_pacing(Duration::ZERO),
        )
    }

    fn contacts(rows: &[(&str, &str)]) -> SheetRecords {
        SheetRecords {
            columns: vec!["mobile".to_string(), "name".to_string()],
            records: rows
                .iter()
                .map(|(mobile, name)| {
                    ContactRecord::from_iter([("mobile", *mobile), ("name", *name)])
                })
                .collect(),
        }
    }

    fn request(message: &str) -> CampaignRequest {
        CampaignRequest {
            sheet_url: "https://docs.google.com/spreadsheets/d/abc123/edit".to_string(),
            phone_column: None,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_estimate_cost() {
        assert_eq!(estimate_cost(200, DEFAULT_UNIT_COST), dec!(6.00));
        assert_eq!(estimate_cost(200, DEFAULT_UNIT_COST).to_string(), "6.00");
        assert_eq!(estimate_cost(1, DEFAULT_UNIT_COST), dec!(0.03));
        assert_eq!(estimate_cost(7, dec!(0.0076)), dec!(0.05));
    }

    #[tokio::test]
    async fn test_prepare_defaults_to_first_column_and_trims() {
        let engine = engine(
            contacts(&[(" 0712 ", "Ana"), ("0799\t", "Bo")]),
            CountingGateway::default(),
        );

        let prepared = engine.prepare(&request("hi")).await.unwrap();
        assert_eq!(prepared.phone_column, "mobile");
        assert_eq!(prepared.table.records()[0].get("mobile"), Some("0712"));
        assert_eq!(prepared.estimated_cost, dec!(0.06));
    }

    #[tokio::test]
    async fn test_run_tallies_every_record() {
        let gateway = CountingGateway::default();
        let engine = engine(
            contacts(&[("1", "Ana"), ("bad-2", "Bo"), ("3", "Cy")]),
            gateway.clone(),
        );

        let summary = engine.run(&request("hi"), &SilentObserver).await.unwrap();
        assert_eq!(summary.sent, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.total(), 3);
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_empty_sheet_never_dispatches() {
        let gateway = CountingGateway::default();
        let engine = engine(contacts(&[]), gateway.clone());

        let err = engine.run(&request("hi"), &SilentObserver).await.unwrap_err();
        assert!(matches!(err, CampaignError::EmptySource));
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_explicit_unknown_column() {
        let engine = engine(contacts(&[("1", "Ana")]), CountingGateway::default());
        let mut req = request("hi");
        req.phone_column = Some("phone".to_string());

        let err = engine.prepare(&req).await.unwrap_err();
        assert!(matches!(err, CampaignError::UnknownColumn { name } if name == "phone"));
    }

    #[tokio::test]
    async fn test_blank_message_blocks_launch() {
        let gateway = CountingGateway::default();
        let engine = engine(contacts(&[("1", "Ana")]), gateway.clone());

        let err = engine.run(&request(""), &SilentObserver).await.unwrap_err();
        assert!(matches!(err, CampaignError::EmptyMessage));
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_crash_mid_campaign_returns_partial_summary() {
        let gateway = CountingGateway::default();
        let engine = engine(
            contacts(&[("1", "Ana"), ("bad-2", "Bo"), ("crash-3", "Cy"), ("4", "Di")]),
            gateway.clone(),
        );

        let err = engine.run(&request("hi"), &SilentObserver).await.unwrap_err();
        match err {
            CampaignError::Aborted { partial, .. } => {
                assert_eq!(partial.sent, 1);
                assert_eq!(partial.failed, 1);
                assert_eq!(partial.failures[0].address, "bad-2");
            }
            other => panic!("expected an aborted campaign, got {:?}", other),
        }
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 3);
    }
}
