//! Low-credit and credit-added policy
//!
//! Pure function of a before/after balance pair. Evaluated once per committed
//! ledger mutation, so a balance that stays under the threshold across several
//! debits only alerts on the crossing.

/// Threshold configuration injected from `Config`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdPolicy {
    pub low_credit_threshold_minor: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditEvent {
    CreditAdded { balance_minor: i64 },
    LowCredit { balance_minor: i64, threshold_minor: i64 },
}

/// Events triggered by a balance moving from `old` to `new`
///
/// "credit added" comes first when both fire.
pub fn evaluate(old: Option<i64>, new: i64, threshold_minor: i64) -> Vec<CreditEvent> {
    let mut events = Vec::new();

    if let Some(old) = old {
        if new > old {
            events.push(CreditEvent::CreditAdded { balance_minor: new });
        }
    }

    if new < threshold_minor && old.map_or(true, |old| old >= threshold_minor) {
        events.push(CreditEvent::LowCredit {
            balance_minor: new,
            threshold_minor,
        });
    }

    events
}

impl ThresholdPolicy {
    pub fn evaluate(&self, old: Option<i64>, new: i64) -> Vec<CreditEvent> {
        evaluate(old, new, self.low_credit_threshold_minor)
    }
}
