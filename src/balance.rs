use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;

use crate::schemas::{Item, ItemId, Person, PersonId};

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PersonSummary {
    pub name: String,
    pub paid: f64,
    pub owes: f64,
    pub items: Vec<String>,
    pub balance: f64,
}

/// Per person summaries, in the same order as the people they were built from.
pub type Summary = IndexMap<PersonId, PersonSummary>;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyTotals {
    pub total_spent: f64,
    pub total_paid: f64,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BalanceError {
    #[error("Item {item_id} is shared by nobody, its price can't be divided")]
    DivisionUndefined { item_id: ItemId },
}

pub fn compute_summary(people: &[Person], items: &[Item]) -> Result<Summary, BalanceError> {
    let mut summary: Summary = people
        .iter()
        .map(|person| {
            let entry = PersonSummary {
                name: person.name.clone(),
                ..Default::default()
            };
            (person.id.clone(), entry)
        })
        .collect();

    for item in items {
        if item.shared_by.is_empty() {
            return Err(BalanceError::DivisionUndefined {
                item_id: item.id.clone(),
            });
        }
        let share = item.price / item.shared_by.len() as f64;

        // Ids that are no longer part of the party contribute nothing
        if let Some(payer) = summary.get_mut(&item.paid_by) {
            payer.paid += item.price;
        }
        for participant in &item.shared_by {
            if let Some(entry) = summary.get_mut(participant) {
                entry.owes += share;
                entry.items.push(format!("{} ({})", item.name, format_amount(share)));
            }
        }
    }

    for entry in summary.values_mut() {
        entry.balance = entry.paid - entry.owes;
    }

    tracing::debug!(
        people = people.len(),
        items = items.len(),
        "computed party summary"
    );
    Ok(summary)
}

/// Two decimals, with exact half-cent ties rounded away from zero.
pub fn format_amount(amount: f64) -> String {
    // A double sits exactly on a half cent only when it is an odd number of eighths
    let eighths = amount * 8.0;
    if eighths.fract() == 0.0 && eighths % 2.0 != 0.0 {
        return format!("{:.2}", (amount * 100.0).round() / 100.0);
    }
    format!("{:.2}", amount)
}

pub fn party_totals(summary: &Summary) -> PartyTotals {
    summary
        .values()
        .fold(PartyTotals::default(), |mut totals, entry| {
            totals.total_spent += entry.owes;
            totals.total_paid += entry.paid;
            totals
        })
}
