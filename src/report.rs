use serde::Serialize;

use crate::balance::{party_totals, PartyTotals, PersonSummary, Summary};
use crate::error::{AppError, Result};
use crate::schemas::{Item, Party, Person};
use crate::settlement::{compute_payments, Payment, PersonPayments};

#[derive(Clone, Debug, Serialize)]
pub struct PartyReport {
    pub people: Summary,
    pub totals: PartyTotals,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payments: Option<Vec<Payment>>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonDetail {
    pub person: Person,
    pub summary: PersonSummary,
    pub items_paid: Vec<Item>,
    pub items_consumed: Vec<Item>,
    pub payments: PersonPayments,
}

impl PartyReport {
    pub fn summary_only(party: &Party) -> Result<Self> {
        let people = party.summary()?;
        Ok(PartyReport {
            totals: party_totals(&people),
            people,
            payments: None,
        })
    }

    pub fn full(party: &Party) -> Result<Self> {
        let people = party.summary()?;
        let payments = compute_payments(&people);
        Ok(PartyReport {
            totals: party_totals(&people),
            people,
            payments: Some(payments),
        })
    }
}

impl PersonDetail {
    pub fn build(party: &Party, person_id: &str) -> Result<Self> {
        let person = party.person(person_id)?.clone();
        let mut summary = party.summary()?;
        let payments = compute_payments(&summary);
        let entry = summary
            .shift_remove(person_id)
            .ok_or_else(|| AppError::PersonNotFound(person_id.to_string()))?;

        let items_paid = party
            .items
            .iter()
            .filter(|item| item.paid_by == person_id)
            .cloned()
            .collect();
        let items_consumed = party
            .items
            .iter()
            .filter(|item| item.shared_by.iter().any(|id| id == person_id))
            .cloned()
            .collect();

        Ok(PersonDetail {
            person,
            summary: entry,
            items_paid,
            items_consumed,
            payments: PersonPayments::for_person(&payments, person_id),
        })
    }
}
