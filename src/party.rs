use bson::oid::ObjectId;
use chrono::Utc;

use crate::balance::{compute_summary, BalanceError, Summary};
use crate::error::{AppError, Result};
use crate::schemas::{
    Item, ItemUpdate, NewItem, NewPerson, Party, PartyUpdate, Person, PersonId, PersonUpdate,
};
use crate::settlement::{compute_payments, Payment};

fn new_id() -> String {
    ObjectId::new().to_hex()
}

fn clean_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::EmptyName);
    }
    Ok(name.to_string())
}

/// Drops the person from every item. Items they paid for go away, and so do
/// items nobody shares anymore.
pub fn cascade_person_removal(items: Vec<Item>, person_id: &str) -> Vec<Item> {
    items
        .into_iter()
        .filter(|item| item.paid_by != person_id)
        .map(|mut item| {
            item.shared_by.retain(|id| id != person_id);
            item
        })
        .filter(|item| !item.shared_by.is_empty())
        .collect()
}

impl Party {
    pub fn new(id: String, title: Option<String>) -> Self {
        let now = Utc::now();
        Party {
            id,
            title: title.map(|t| t.trim().to_string()).unwrap_or_default(),
            people: vec![],
            items: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn update(&mut self, update: PartyUpdate) {
        if let Some(title) = update.title {
            self.title = title.trim().to_string();
        }
        self.touch();
    }

    pub fn person(&self, person_id: &str) -> Result<&Person> {
        self.people
            .iter()
            .find(|person| person.id == person_id)
            .ok_or_else(|| AppError::PersonNotFound(person_id.to_string()))
    }

    fn has_person(&self, person_id: &str) -> bool {
        self.people.iter().any(|person| person.id == person_id)
    }

    pub fn add_person(&mut self, new_person: NewPerson) -> Result<Person> {
        let person = Person {
            id: new_id(),
            name: clean_name(&new_person.name)?,
            payment_method: new_person.payment_method,
            excluded_items: vec![],
        };
        self.people.push(person.clone());
        self.touch();
        Ok(person)
    }

    pub fn update_person(&mut self, person_id: &str, update: PersonUpdate) -> Result<Person> {
        let name = update.name.as_deref().map(clean_name).transpose()?;
        let person = self
            .people
            .iter_mut()
            .find(|person| person.id == person_id)
            .ok_or_else(|| AppError::PersonNotFound(person_id.to_string()))?;
        if let Some(name) = name {
            person.name = name;
        }
        if let Some(payment_method) = update.payment_method {
            person.payment_method = payment_method;
        }
        let person = person.clone();
        self.touch();
        Ok(person)
    }

    pub fn remove_person(&mut self, person_id: &str) -> Result<Person> {
        let position = self
            .people
            .iter()
            .position(|person| person.id == person_id)
            .ok_or_else(|| AppError::PersonNotFound(person_id.to_string()))?;
        let person = self.people.remove(position);
        let items = std::mem::take(&mut self.items);
        self.items = cascade_person_removal(items, person_id);
        self.touch();
        Ok(person)
    }

    /// Checks payer and participants against the current people and drops
    /// repeated participants, keeping the first occurrence.
    fn validate_item(
        &self,
        name: &str,
        price: f64,
        paid_by: &str,
        shared_by: Vec<PersonId>,
    ) -> Result<(String, Vec<PersonId>)> {
        let name = clean_name(name)?;
        if !price.is_finite() || price <= 0.0 {
            return Err(AppError::InvalidPrice(price));
        }
        if !self.has_person(paid_by) {
            return Err(AppError::UnknownPerson(paid_by.to_string()));
        }
        let mut participants: Vec<PersonId> = Vec::with_capacity(shared_by.len());
        for id in shared_by {
            if !self.has_person(&id) {
                return Err(AppError::UnknownPerson(id));
            }
            if !participants.contains(&id) {
                participants.push(id);
            }
        }
        if participants.is_empty() {
            return Err(AppError::NoParticipants);
        }
        Ok((name, participants))
    }

    pub fn add_item(&mut self, new_item: NewItem) -> Result<Item> {
        let (name, shared_by) = self.validate_item(
            &new_item.name,
            new_item.price,
            &new_item.paid_by,
            new_item.shared_by,
        )?;
        let item = Item {
            id: new_id(),
            name,
            price: new_item.price,
            paid_by: new_item.paid_by,
            shared_by,
        };
        self.items.push(item.clone());
        self.touch();
        Ok(item)
    }

    pub fn update_item(&mut self, item_id: &str, update: ItemUpdate) -> Result<Item> {
        let position = self
            .items
            .iter()
            .position(|item| item.id == item_id)
            .ok_or_else(|| AppError::ItemNotFound(item_id.to_string()))?;
        let current = &self.items[position];
        let name = update.name.unwrap_or_else(|| current.name.clone());
        let price = update.price.unwrap_or(current.price);
        let paid_by = update.paid_by.unwrap_or_else(|| current.paid_by.clone());
        let shared_by = update
            .shared_by
            .unwrap_or_else(|| current.shared_by.clone());

        let (name, shared_by) = self.validate_item(&name, price, &paid_by, shared_by)?;
        let item = &mut self.items[position];
        item.name = name;
        item.price = price;
        item.paid_by = paid_by;
        item.shared_by = shared_by;
        let item = item.clone();
        self.touch();
        Ok(item)
    }

    pub fn remove_item(&mut self, item_id: &str) -> Result<Item> {
        let position = self
            .items
            .iter()
            .position(|item| item.id == item_id)
            .ok_or_else(|| AppError::ItemNotFound(item_id.to_string()))?;
        let item = self.items.remove(position);
        for person in &mut self.people {
            person.excluded_items.retain(|id| id != item_id);
        }
        self.touch();
        Ok(item)
    }

    /// Everyone who has not opted out of the item, in people order.
    pub fn shared_by_for(&self, item_id: &str) -> Vec<PersonId> {
        self.people
            .iter()
            .filter(|person| !person.excluded_items.iter().any(|id| id == item_id))
            .map(|person| person.id.clone())
            .collect()
    }

    /// Flips the person's opt-out for the item and rebuilds the item's
    /// participants from the opt-outs. Nothing changes if that would leave
    /// the item shared by nobody.
    fn set_excluded(&mut self, person_id: &str, item_id: &str, excluded: bool) -> Result<Item> {
        let person_idx = self
            .people
            .iter()
            .position(|person| person.id == person_id)
            .ok_or_else(|| AppError::PersonNotFound(person_id.to_string()))?;
        let item_idx = self
            .items
            .iter()
            .position(|item| item.id == item_id)
            .ok_or_else(|| AppError::ItemNotFound(item_id.to_string()))?;

        let previous = self.people[person_idx].excluded_items.clone();
        let exclusions = &mut self.people[person_idx].excluded_items;
        exclusions.retain(|id| id != item_id);
        if excluded {
            exclusions.push(item_id.to_string());
        }

        let current = &self.items[item_idx];
        let validated = self.validate_item(
            &current.name,
            current.price,
            &current.paid_by,
            self.shared_by_for(item_id),
        );
        let shared_by = match validated {
            Ok((_, shared_by)) => shared_by,
            Err(err) => {
                self.people[person_idx].excluded_items = previous;
                return Err(err);
            }
        };

        let item = &mut self.items[item_idx];
        item.shared_by = shared_by;
        let item = item.clone();
        self.touch();
        Ok(item)
    }

    pub fn exclude_item(&mut self, person_id: &str, item_id: &str) -> Result<Item> {
        self.set_excluded(person_id, item_id, true)
    }

    pub fn include_item(&mut self, person_id: &str, item_id: &str) -> Result<Item> {
        self.set_excluded(person_id, item_id, false)
    }

    pub fn summary(&self) -> std::result::Result<Summary, BalanceError> {
        compute_summary(&self.people, &self.items)
    }

    pub fn payments(&self) -> std::result::Result<Vec<Payment>, BalanceError> {
        Ok(compute_payments(&self.summary()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balance::tests::item;
    use crate::schemas::PaymentMethod;

    fn party_with(names: &[&str]) -> (Party, Vec<PersonId>) {
        let mut party = Party::new("party".into(), Some("  BBQ  ".into()));
        let ids: Vec<PersonId> = names
            .iter()
            .map(|name| {
                party
                    .add_person(NewPerson {
                        name: name.to_string(),
                        payment_method: None,
                    })
                    .unwrap()
                    .id
            })
            .collect();
        (party, ids)
    }

    fn new_item(price: f64, paid_by: &str, shared_by: &[&str]) -> NewItem {
        NewItem {
            name: "Lunch".into(),
            price,
            paid_by: paid_by.to_string(),
            shared_by: shared_by.iter().map(|id| id.to_string()).collect(),
        }
    }

    #[test]
    fn new_party_trims_title() {
        let (party, _) = party_with(&[]);
        assert_eq!(party.title, "BBQ");
        assert!(party.people.is_empty());
    }

    #[test]
    fn person_names_are_trimmed_and_required() {
        let (mut party, ids) = party_with(&["  Alice "]);
        assert_eq!(party.person(&ids[0]).unwrap().name, "Alice");
        let err = party
            .add_person(NewPerson {
                name: "   ".into(),
                payment_method: None,
            })
            .unwrap_err();
        assert!(matches!(err, AppError::EmptyName));
    }

    #[test]
    fn update_person_renames() {
        let (mut party, ids) = party_with(&["Alice"]);
        let updated = party
            .update_person(
                &ids[0],
                PersonUpdate {
                    name: Some("Alicia".into()),
                    payment_method: None,
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Alicia");
        assert!(matches!(
            party.update_person("missing", PersonUpdate::default()),
            Err(AppError::PersonNotFound(_))
        ));
    }

    #[test]
    fn items_are_validated_against_people() {
        let (mut party, ids) = party_with(&["Alice", "Bob"]);
        let (a, b) = (ids[0].as_str(), ids[1].as_str());

        assert!(matches!(
            party.add_item(new_item(0.0, a, &[a])),
            Err(AppError::InvalidPrice(_))
        ));
        assert!(matches!(
            party.add_item(new_item(f64::NAN, a, &[a])),
            Err(AppError::InvalidPrice(_))
        ));
        assert!(matches!(
            party.add_item(new_item(10.0, "stranger", &[a])),
            Err(AppError::UnknownPerson(_))
        ));
        assert!(matches!(
            party.add_item(new_item(10.0, a, &[a, "stranger"])),
            Err(AppError::UnknownPerson(_))
        ));
        assert!(matches!(
            party.add_item(new_item(10.0, a, &[])),
            Err(AppError::NoParticipants)
        ));

        let item = party.add_item(new_item(10.0, a, &[b, a, b])).unwrap();
        assert_eq!(item.shared_by, vec![b.to_string(), a.to_string()]);
        assert_eq!(party.items.len(), 1);
    }

    #[test]
    fn update_item_merges_and_revalidates() {
        let (mut party, ids) = party_with(&["Alice", "Bob"]);
        let (a, b) = (ids[0].as_str(), ids[1].as_str());
        let item = party.add_item(new_item(10.0, a, &[a, b])).unwrap();

        let updated = party
            .update_item(
                &item.id,
                ItemUpdate {
                    price: Some(25.0),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.price, 25.0);
        assert_eq!(updated.shared_by.len(), 2);

        let err = party
            .update_item(
                &item.id,
                ItemUpdate {
                    shared_by: Some(vec![]),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, AppError::NoParticipants));
        assert_eq!(party.items[0].shared_by.len(), 2);
    }

    #[test]
    fn removing_an_item() {
        let (mut party, ids) = party_with(&["Alice"]);
        let item = party.add_item(new_item(10.0, &ids[0], &[ids[0].as_str()])).unwrap();
        assert_eq!(party.remove_item(&item.id).unwrap().id, item.id);
        assert!(matches!(
            party.remove_item(&item.id),
            Err(AppError::ItemNotFound(_))
        ));
    }

    #[test]
    fn payment_method_can_be_set_and_cleared() {
        let (mut party, ids) = party_with(&["Alice"]);
        let method = PaymentMethod {
            promptpay: Some("0812345678".into()),
            ..Default::default()
        };
        let updated = party
            .update_person(
                &ids[0],
                PersonUpdate {
                    name: None,
                    payment_method: Some(Some(method.clone())),
                },
            )
            .unwrap();
        assert_eq!(updated.payment_method, Some(method));

        let renamed = party
            .update_person(
                &ids[0],
                PersonUpdate {
                    name: Some("Al".into()),
                    payment_method: None,
                },
            )
            .unwrap();
        assert!(renamed.payment_method.is_some());

        let cleared = party
            .update_person(
                &ids[0],
                PersonUpdate {
                    name: None,
                    payment_method: Some(None),
                },
            )
            .unwrap();
        assert!(cleared.payment_method.is_none());
    }

    #[test]
    fn opting_out_rebuilds_participants() {
        let (mut party, ids) = party_with(&["Alice", "Bob", "Cleo"]);
        let (a, b, c) = (ids[0].as_str(), ids[1].as_str(), ids[2].as_str());
        let item = party.add_item(new_item(90.0, a, &[a, b, c])).unwrap();

        let updated = party.exclude_item(b, &item.id).unwrap();
        assert_eq!(updated.shared_by, vec![a.to_string(), c.to_string()]);
        assert_eq!(party.person(b).unwrap().excluded_items, vec![item.id.clone()]);

        // repeating an opt-out is harmless
        party.exclude_item(b, &item.id).unwrap();
        assert_eq!(party.person(b).unwrap().excluded_items.len(), 1);

        let restored = party.include_item(b, &item.id).unwrap();
        assert_eq!(restored.shared_by, vec![a.to_string(), b.to_string(), c.to_string()]);
        assert!(party.person(b).unwrap().excluded_items.is_empty());
    }

    #[test]
    fn last_participant_cannot_opt_out() {
        let (mut party, ids) = party_with(&["Alice", "Bob"]);
        let (a, b) = (ids[0].as_str(), ids[1].as_str());
        let item = party.add_item(new_item(20.0, a, &[a, b])).unwrap();

        party.exclude_item(a, &item.id).unwrap();
        let err = party.exclude_item(b, &item.id).unwrap_err();
        assert!(matches!(err, AppError::NoParticipants));
        assert!(party.person(b).unwrap().excluded_items.is_empty());
        assert_eq!(party.items[0].shared_by, vec![b.to_string()]);
    }

    #[test]
    fn opting_out_needs_known_person_and_item() {
        let (mut party, ids) = party_with(&["Alice"]);
        let a = ids[0].as_str();
        let item = party.add_item(new_item(20.0, a, &[a])).unwrap();
        assert!(matches!(
            party.exclude_item("ghost", &item.id),
            Err(AppError::PersonNotFound(_))
        ));
        assert!(matches!(
            party.exclude_item(a, "ghost"),
            Err(AppError::ItemNotFound(_))
        ));
    }

    #[test]
    fn removing_an_item_forgets_opt_outs() {
        let (mut party, ids) = party_with(&["Alice", "Bob"]);
        let (a, b) = (ids[0].as_str(), ids[1].as_str());
        let item = party.add_item(new_item(20.0, a, &[a, b])).unwrap();
        party.exclude_item(b, &item.id).unwrap();
        party.remove_item(&item.id).unwrap();
        assert!(party.person(b).unwrap().excluded_items.is_empty());
    }

    #[test]
    fn cascade_removes_participant_and_empty_items() {
        let items = vec![
            item("shared", 20.0, "a", &["a", "b"]),
            item("only-b", 10.0, "a", &["b"]),
            item("paid-by-b", 30.0, "b", &["a"]),
        ];
        let remaining = cascade_person_removal(items, "b");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "shared");
        assert_eq!(remaining[0].shared_by, vec!["a".to_string()]);
    }

    #[test]
    fn removing_a_person_cascades_into_items() {
        let (mut party, ids) = party_with(&["Alice", "Bob"]);
        let (a, b) = (ids[0].as_str(), ids[1].as_str());
        party.add_item(new_item(100.0, a, &[a, b])).unwrap();
        party.add_item(new_item(40.0, b, &[a])).unwrap();

        party.remove_person(b).unwrap();

        assert_eq!(party.people.len(), 1);
        assert_eq!(party.items.len(), 1);
        assert_eq!(party.items[0].shared_by, vec![a.to_string()]);

        let summary = party.summary().unwrap();
        assert_eq!(summary[a].balance, 0.0);
        assert!(party.payments().unwrap().is_empty());
    }
}
