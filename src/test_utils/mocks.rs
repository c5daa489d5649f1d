use {
    crate::domain::{
        error::PipelineError,
        gateway::{GatewayRefund, NotificationDispatch, RefundGateway},
        money::Money,
        payment::PaymentMethod,
        refund::RefundRequest,
    },
    async_trait::async_trait,
    std::sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    },
    uuid::Uuid,
};

/// Refund gateway double. Records every submission; flip `fail` to make
/// calls error like a timed-out or refusing gateway.
pub struct MockRefundGateway {
    calls: Mutex<Vec<(PaymentMethod, String, i64)>>,
    fail: AtomicBool,
}

impl MockRefundGateway {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    pub fn failing() -> Self {
        let gateway = Self::new();
        gateway.fail.store(true, Ordering::Relaxed);
        gateway
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::Relaxed);
    }

    pub fn calls(&self) -> Vec<(PaymentMethod, String, i64)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockRefundGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RefundGateway for MockRefundGateway {
    async fn submit_refund(
        &self,
        method: PaymentMethod,
        gateway_ref: &str,
        amount: &Money,
        reference: Uuid,
    ) -> Result<GatewayRefund, PipelineError> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(PipelineError::Gateway("mock gateway refused".into()));
        }
        self.calls.lock().unwrap().push((
            method,
            gateway_ref.to_string(),
            amount.amount().cents(),
        ));
        Ok(GatewayRefund {
            refund_txn_id: format!("gw_re_{reference}"),
        })
    }
}

/// Notification double that only counts what was dispatched.
pub struct RecordingNotifier {
    confirmations: Mutex<Vec<String>>,
    failures: Mutex<Vec<(String, String)>>,
    refund_updates: Mutex<Vec<(Uuid, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            confirmations: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
            refund_updates: Mutex::new(Vec::new()),
        }
    }

    pub fn confirmations(&self) -> Vec<String> {
        self.confirmations.lock().unwrap().clone()
    }

    pub fn failures(&self) -> Vec<(String, String)> {
        self.failures.lock().unwrap().clone()
    }

    pub fn refund_updates(&self) -> Vec<(Uuid, String)> {
        self.refund_updates.lock().unwrap().clone()
    }
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationDispatch for RecordingNotifier {
    async fn booking_confirmed(&self, booking_ref: &str) -> Result<(), PipelineError> {
        self.confirmations
            .lock()
            .unwrap()
            .push(booking_ref.to_string());
        Ok(())
    }

    async fn booking_payment_failed(
        &self,
        booking_ref: &str,
        reason: &str,
    ) -> Result<(), PipelineError> {
        self.failures
            .lock()
            .unwrap()
            .push((booking_ref.to_string(), reason.to_string()));
        Ok(())
    }

    async fn refund_update(
        &self,
        refund: &RefundRequest,
        stage: &str,
    ) -> Result<(), PipelineError> {
        self.refund_updates
            .lock()
            .unwrap()
            .push((refund.id, stage.to_string()));
        Ok(())
    }
}
