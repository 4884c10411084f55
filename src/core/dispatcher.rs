use crate::core::report::CampaignReport;
use crate::core::{
    CampaignSummary, ContactRecord, ContactTable, DeliveryOutcome, MessageTemplate,
    MessagingGateway, ProgressObserver,
};
use crate::utils::error::{CampaignError, GatewayError, Result};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

/// Reason recorded when a send fails for anything other than a gateway
/// rejection.
pub const UNKNOWN_ERROR_REASON: &str = "unknown error";

pub const DEFAULT_PACING: Duration = Duration::from_millis(100);

/// Sends one message per contact, one at a time.
pub struct Dispatcher<G: MessagingGateway> {
    gateway: G,
    pacing: Duration,
}

impl<G: MessagingGateway> Dispatcher<G> {
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            pacing: DEFAULT_PACING,
        }
    }

    /// Fixed delay between two consecutive sends.
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn pacing(&self) -> Duration {
        self.pacing
    }

    /// Checks the pre-conditions and returns a lazy cursor over the outcomes.
    /// Nothing is sent until the cursor is polled.
    pub fn dispatch<'a>(
        &'a self,
        template: &'a MessageTemplate,
        table: &'a ContactTable,
        phone_field: &str,
    ) -> Result<Dispatch<'a, G>> {
        if template.is_empty() {
            return Err(CampaignError::EmptyMessage);
        }
        let from = match self.gateway.sender() {
            Some(from) if self.gateway.is_authenticated() => from.to_string(),
            _ => return Err(CampaignError::GatewayUnauthenticated),
        };
        if !table.has_column(phone_field) {
            return Err(CampaignError::UnknownColumn {
                name: phone_field.to_string(),
            });
        }
        if table.phone_field() != Some(phone_field) {
            return Err(CampaignError::PhoneColumnNotNormalized {
                name: phone_field.to_string(),
            });
        }

        Ok(Dispatch {
            gateway: &self.gateway,
            template,
            records: table.records().iter(),
            phone_field: phone_field.to_string(),
            from,
            pacing: self.pacing,
            processed: 0,
            total: table.size(),
        })
    }
}

/// In-progress dispatch. Each call to [`Dispatch::next_outcome`] performs
/// exactly one send.
pub struct Dispatch<'a, G: MessagingGateway> {
    gateway: &'a G,
    template: &'a MessageTemplate,
    records: std::slice::Iter<'a, ContactRecord>,
    phone_field: String,
    from: String,
    pacing: Duration,
    processed: usize,
    total: usize,
}

impl<'a, G: MessagingGateway> Dispatch<'a, G> {
    pub fn total(&self) -> usize {
        self.total
    }

    /// Sends to the next contact and reports progress afterwards. Returns
    /// `None` once every record has been processed.
    pub async fn next_outcome(
        &mut self,
        observer: &dyn ProgressObserver,
    ) -> Option<DeliveryOutcome> {
        let record = self.records.next()?;

        if self.processed > 0 && !self.pacing.is_zero() {
            tokio::time::sleep(self.pacing).await;
        }

        let address = record.get(&self.phone_field).unwrap_or_default().to_string();
        let outcome = match self
            .gateway
            .send(self.template.as_str(), &self.from, &address)
            .await
        {
            Ok(()) => {
                tracing::debug!("Sent to {}", address);
                DeliveryOutcome::sent(address)
            }
            Err(GatewayError::Rejected { code, reason }) => {
                tracing::warn!("Gateway rejected {} (code {:?}): {}", address, code, reason);
                DeliveryOutcome::failed(address, reason)
            }
            Err(GatewayError::Unexpected { message }) => {
                tracing::warn!("Send to {} failed: {}", address, message);
                DeliveryOutcome::failed(address, UNKNOWN_ERROR_REASON)
            }
        };

        self.processed += 1;
        observer.on_progress(self.processed, self.total);
        Some(outcome)
    }

    /// Runs the remaining sends, feeding every outcome into `report`.
    ///
    /// A panic inside the gateway stops the run with [`CampaignError::Aborted`]
    /// carrying whatever `report` held at that point.
    pub async fn drain_into(
        mut self,
        report: &mut CampaignReport,
        observer: &dyn ProgressObserver,
    ) -> Result<usize> {
        let drained = AssertUnwindSafe(async {
            while let Some(outcome) = self.next_outcome(observer).await {
                report.accumulate(&outcome);
            }
        })
        .catch_unwind()
        .await;

        match drained {
            Ok(()) => Ok(self.processed),
            Err(payload) => {
                let reason = panic_reason(payload.as_ref());
                tracing::error!(
                    "Dispatch aborted after {} of {} contacts: {}",
                    report.recorded(),
                    self.total,
                    reason
                );
                Err(CampaignError::Aborted {
                    reason,
                    partial: report.snapshot(),
                })
            }
        }
    }

    /// Runs the remaining sends and finalizes a fresh report.
    pub async fn run(self, observer: &dyn ProgressObserver) -> Result<CampaignSummary> {
        let mut report = CampaignReport::new();
        self.drain_into(&mut report, observer).await?;
        let summary = report.finalize();
        observer.on_complete(&summary);
        Ok(summary)
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "messaging gateway crashed".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::report::Failure;
    use crate::core::SilentObserver;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeGateway {
        sender: Option<String>,
        authenticated: bool,
        failures: HashMap<String, GatewayError>,
        crash_on: Option<String>,
        calls: Mutex<Vec<(String, String, String)>>,
    }

    impl FakeGateway {
        fn ready() -> Self {
            Self {
                sender: Some("+15550000".to_string()),
                authenticated: true,
                ..Default::default()
            }
        }

        fn rejecting(mut self, address: &str, reason: &str) -> Self {
            self.failures.insert(
                address.to_string(),
                GatewayError::Rejected {
                    code: Some(21211),
                    reason: reason.to_string(),
                },
            );
            self
        }

        fn faulting(mut self, address: &str, message: &str) -> Self {
            self.failures.insert(
                address.to_string(),
                GatewayError::Unexpected {
                    message: message.to_string(),
                },
            );
            self
        }

        fn crashing_on(mut self, address: &str) -> Self {
            self.crash_on = Some(address.to_string());
            self
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl MessagingGateway for FakeGateway {
        fn is_authenticated(&self) -> bool {
            self.authenticated
        }

        fn sender(&self) -> Option<&str> {
            self.sender.as_deref()
        }

        async fn send(
            &self,
            body: &str,
            from: &str,
            to: &str,
        ) -> std::result::Result<(), GatewayError> {
            if self.crash_on.as_deref() == Some(to) {
                panic!("connection pool poisoned");
            }
            self.calls
                .lock()
                .unwrap()
                .push((body.to_string(), from.to_string(), to.to_string()));
            match self.failures.get(to) {
                Some(err) => Err(err.clone()),
                None => Ok(()),
            }
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        progress: Mutex<Vec<(usize, usize)>>,
        completed: Mutex<Option<CampaignSummary>>,
    }

    impl ProgressObserver for RecordingObserver {
        fn on_progress(&self, processed: usize, total: usize) {
            self.progress.lock().unwrap().push((processed, total));
        }

        fn on_complete(&self, summary: &CampaignSummary) {
            *self.completed.lock().unwrap() = Some(summary.clone());
        }
    }

    fn table(phones: &[&str]) -> ContactTable {
        let records = phones
            .iter()
            .map(|p| ContactRecord::from_iter([("phone", *p)]))
            .collect();
        let mut table = ContactTable::new(vec!["phone".to_string()], records).unwrap();
        table.normalize_phone_column("phone").unwrap();
        table
    }

    fn template(body: &str) -> MessageTemplate {
        MessageTemplate::new(body).unwrap()
    }

    #[tokio::test]
    async fn test_outcomes_follow_table_order() {
        let dispatcher = Dispatcher::new(FakeGateway::ready().rejecting("B", "invalid number"))
            .with_pacing(Duration::ZERO);
        let contacts = table(&["A", "B", "C"]);
        let message = template("hello");

        let mut dispatch = dispatcher.dispatch(&message, &contacts, "phone").unwrap();
        let mut outcomes = Vec::new();
        while let Some(outcome) = dispatch.next_outcome(&SilentObserver).await {
            outcomes.push(outcome);
        }

        assert_eq!(
            outcomes,
            vec![
                DeliveryOutcome::sent("A"),
                DeliveryOutcome::failed("B", "invalid number"),
                DeliveryOutcome::sent("C"),
            ]
        );

        let mut report = CampaignReport::new();
        outcomes.iter().for_each(|o| report.accumulate(o));
        let summary = report.finalize();
        assert_eq!(summary.sent, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(
            summary.failures,
            vec![Failure {
                address: "B".to_string(),
                reason: "invalid number".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_unexpected_fault_is_reported_as_unknown_error() {
        let dispatcher = Dispatcher::new(FakeGateway::ready().faulting("B", "socket closed"))
            .with_pacing(Duration::ZERO);
        let contacts = table(&["A", "B"]);
        let message = template("hello");

        let summary = dispatcher
            .dispatch(&message, &contacts, "phone")
            .unwrap()
            .run(&SilentObserver)
            .await
            .unwrap();

        assert_eq!(summary.failures[0].reason, UNKNOWN_ERROR_REASON);
        assert_eq!(summary.total(), contacts.size());
    }

    #[tokio::test]
    async fn test_sends_template_from_configured_sender() {
        let dispatcher = Dispatcher::new(FakeGateway::ready()).with_pacing(Duration::ZERO);
        let contacts = table(&["+15551234"]);
        let message = template("Sale ends today");

        dispatcher
            .dispatch(&message, &contacts, "phone")
            .unwrap()
            .run(&SilentObserver)
            .await
            .unwrap();

        let calls = dispatcher.gateway().calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![(
                "Sale ends today".to_string(),
                "+15550000".to_string(),
                "+15551234".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_empty_message_sends_nothing() {
        let dispatcher = Dispatcher::new(FakeGateway::ready());
        let contacts = table(&["A", "B"]);
        let message = template("");

        let result = dispatcher.dispatch(&message, &contacts, "phone");
        assert!(matches!(result, Err(CampaignError::EmptyMessage)));
        assert_eq!(dispatcher.gateway().call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_fast() {
        let gateway = FakeGateway {
            sender: Some("+15550000".to_string()),
            authenticated: false,
            ..Default::default()
        };
        let dispatcher = Dispatcher::new(gateway);
        let contacts = table(&["A"]);
        let message = template("hello");

        let result = dispatcher.dispatch(&message, &contacts, "phone");
        assert!(matches!(result, Err(CampaignError::GatewayUnauthenticated)));

        let no_sender = Dispatcher::new(FakeGateway {
            authenticated: true,
            ..Default::default()
        });
        let result = no_sender.dispatch(&message, &contacts, "phone");
        assert!(matches!(result, Err(CampaignError::GatewayUnauthenticated)));
        assert_eq!(no_sender.gateway().call_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_phone_field() {
        let dispatcher = Dispatcher::new(FakeGateway::ready());
        let contacts = table(&["A"]);
        let message = template("hello");

        let result = dispatcher.dispatch(&message, &contacts, "mobile");
        assert!(matches!(result, Err(CampaignError::UnknownColumn { .. })));
    }

    #[tokio::test]
    async fn test_progress_reported_once_per_record() {
        let dispatcher = Dispatcher::new(FakeGateway::ready().rejecting("2", "blocked"))
            .with_pacing(Duration::ZERO);
        let contacts = table(&["1", "2", "3", "4"]);
        let message = template("hi");
        let observer = RecordingObserver::default();

        let summary = dispatcher
            .dispatch(&message, &contacts, "phone")
            .unwrap()
            .run(&observer)
            .await
            .unwrap();

        let progress = observer.progress.lock().unwrap().clone();
        assert_eq!(progress, vec![(1, 4), (2, 4), (3, 4), (4, 4)]);
        assert_eq!(observer.completed.lock().unwrap().as_ref(), Some(&summary));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_inserted_between_sends() {
        let pacing = Duration::from_millis(100);
        let dispatcher = Dispatcher::new(FakeGateway::ready()).with_pacing(pacing);
        let contacts = table(&["1", "2", "3"]);
        let message = template("hi");

        let started = tokio::time::Instant::now();
        dispatcher
            .dispatch(&message, &contacts, "phone")
            .unwrap()
            .run(&SilentObserver)
            .await
            .unwrap();

        assert_eq!(started.elapsed(), pacing * 2);
    }

    #[tokio::test]
    async fn test_phone_field_must_be_the_normalized_column() {
        let dispatcher = Dispatcher::new(FakeGateway::ready());
        let records = vec![ContactRecord::from_iter([("phone", " 1 "), ("alt", " 2 ")])];
        let mut contacts =
            ContactTable::new(vec!["phone".to_string(), "alt".to_string()], records).unwrap();
        let message = template("hello");

        let result = dispatcher.dispatch(&message, &contacts, "phone");
        assert!(matches!(
            result,
            Err(CampaignError::PhoneColumnNotNormalized { name }) if name == "phone"
        ));

        contacts.normalize_phone_column("phone").unwrap();
        let result = dispatcher.dispatch(&message, &contacts, "alt");
        assert!(matches!(result, Err(CampaignError::PhoneColumnNotNormalized { .. })));
        assert_eq!(dispatcher.gateway().call_count(), 0);
    }

    #[tokio::test]
    async fn test_gateway_crash_keeps_partial_tally() {
        let dispatcher = Dispatcher::new(
            FakeGateway::ready()
                .rejecting("2", "blocked")
                .crashing_on("3"),
        )
        .with_pacing(Duration::ZERO);
        let contacts = table(&["1", "2", "3", "4"]);
        let message = template("hi");
        let observer = RecordingObserver::default();

        let mut report = CampaignReport::new();
        let err = dispatcher
            .dispatch(&message, &contacts, "phone")
            .unwrap()
            .drain_into(&mut report, &observer)
            .await
            .unwrap_err();

        match err {
            CampaignError::Aborted { reason, partial } => {
                assert_eq!(reason, "connection pool poisoned");
                assert_eq!(partial.sent, 1);
                assert_eq!(partial.failed, 1);
                assert_eq!(partial.failures[0].address, "2");
            }
            other => panic!("expected Aborted, got {:?}", other),
        }
        assert_eq!(report.recorded(), 2);
        assert_eq!(dispatcher.gateway().call_count(), 2);
        assert_eq!(observer.progress.lock().unwrap().clone(), vec![(1, 4), (2, 4)]);
        assert!(observer.completed.lock().unwrap().is_none());
    }
}
