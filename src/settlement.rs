use serde::{Deserialize, Serialize};

use crate::balance::Summary;
use crate::schemas::PersonId;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Payment {
    pub from: PersonId,
    pub to: PersonId,
    pub amount: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonPayments {
    pub payments_to_make: Vec<Payment>,
    pub payments_to_receive: Vec<Payment>,
}

#[derive(Clone, Debug)]
struct Remaining<'a> {
    id: &'a PersonId,
    amount: f64,
}

/// Greedy sweep: every creditor, in summary order, is paid by the debtors in
/// summary order until one side runs out. The number of payments is not
/// minimized.
pub fn compute_payments(summary: &Summary) -> Vec<Payment> {
    let mut creditors = Vec::new();
    let mut debtors = Vec::new();

    for (id, entry) in summary {
        if entry.balance > 0.0 {
            creditors.push(Remaining {
                id,
                amount: entry.balance,
            });
        } else if entry.balance < 0.0 {
            debtors.push(Remaining {
                id,
                amount: entry.balance.abs(),
            });
        }
    }

    let mut payments = Vec::new();
    for creditor in creditors.iter_mut() {
        for debtor in debtors.iter_mut() {
            if creditor.amount > 0.0 && debtor.amount > 0.0 {
                let amount = creditor.amount.min(debtor.amount);
                payments.push(Payment {
                    from: debtor.id.clone(),
                    to: creditor.id.clone(),
                    amount,
                });
                creditor.amount -= amount;
                debtor.amount -= amount;
            }
        }
    }

    tracing::debug!(payments = payments.len(), "computed settlement");
    payments
}

pub fn payments_from<'a>(
    payments: &'a [Payment],
    person_id: &'a str,
) -> impl Iterator<Item = &'a Payment> + 'a {
    payments.iter().filter(move |payment| payment.from == person_id)
}

pub fn payments_to<'a>(
    payments: &'a [Payment],
    person_id: &'a str,
) -> impl Iterator<Item = &'a Payment> + 'a {
    payments.iter().filter(move |payment| payment.to == person_id)
}

impl PersonPayments {
    pub fn for_person(payments: &[Payment], person_id: &str) -> Self {
        PersonPayments {
            payments_to_make: payments_from(payments, person_id).cloned().collect(),
            payments_to_receive: payments_to(payments, person_id).cloned().collect(),
        }
    }
}
