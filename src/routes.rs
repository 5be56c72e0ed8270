use actix_web::{delete, get, patch, post, put, web, HttpResponse};

use crate::error::{AppError, Result};
use crate::report::{PartyReport, PersonDetail};
use crate::schemas::{ItemUpdate, NewItem, NewParty, NewPerson, Party, PartyUpdate, PersonUpdate};
use crate::settlement::PersonPayments;
use crate::store::PartyStore;

type Store = web::Data<dyn PartyStore>;

async fn load(store: &Store, party_id: &str) -> Result<Party> {
    store
        .find(party_id)
        .await?
        .ok_or_else(|| AppError::PartyNotFound(party_id.to_string()))
}

/// Loads the party, applies `edit` and writes the whole document back.
async fn modify<T, F>(store: &Store, party_id: &str, edit: F) -> Result<T>
where
    F: FnOnce(&mut Party) -> Result<T>,
{
    let mut party = load(store, party_id).await?;
    let value = edit(&mut party)?;
    store.replace(&party).await?;
    Ok(value)
}

#[put("/parties/{id}")]
async fn create_party(
    store: Store,
    id: web::Path<String>,
    json: web::Json<NewParty>,
) -> Result<HttpResponse> {
    let party = Party::new(id.into_inner(), json.into_inner().title);
    store.insert(party.clone()).await?;
    tracing::info!(party = %party.id, "party created");
    Ok(HttpResponse::Created().json(party))
}

#[get("/parties")]
async fn list_parties(store: Store) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(store.list().await?))
}

#[get("/parties/{id}")]
async fn get_party(store: Store, id: web::Path<String>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(load(&store, &id).await?))
}

#[patch("/parties/{id}")]
async fn update_party(
    store: Store,
    id: web::Path<String>,
    json: web::Json<PartyUpdate>,
) -> Result<HttpResponse> {
    let party = modify(&store, &id, |party| {
        party.update(json.into_inner());
        Ok(party.clone())
    })
    .await?;
    Ok(HttpResponse::Ok().json(party))
}

#[delete("/parties/{id}")]
async fn delete_party(store: Store, id: web::Path<String>) -> Result<HttpResponse> {
    store.delete(&id).await?;
    tracing::info!(party = %id, "party deleted");
    Ok(HttpResponse::NoContent().finish())
}

#[post("/parties/{id}/people")]
async fn add_person(
    store: Store,
    id: web::Path<String>,
    json: web::Json<NewPerson>,
) -> Result<HttpResponse> {
    let person = modify(&store, &id, |party| party.add_person(json.into_inner())).await?;
    tracing::debug!(party = %id, person = %person.id, "person added");
    Ok(HttpResponse::Created().json(person))
}

#[get("/parties/{id}/people/{person}")]
async fn get_person(store: Store, path: web::Path<(String, String)>) -> Result<HttpResponse> {
    let (id, person_id) = path.into_inner();
    let party = load(&store, &id).await?;
    Ok(HttpResponse::Ok().json(PersonDetail::build(&party, &person_id)?))
}

#[patch("/parties/{id}/people/{person}")]
async fn update_person(
    store: Store,
    path: web::Path<(String, String)>,
    json: web::Json<PersonUpdate>,
) -> Result<HttpResponse> {
    let (id, person_id) = path.into_inner();
    let person = modify(&store, &id, |party| {
        party.update_person(&person_id, json.into_inner())
    })
    .await?;
    Ok(HttpResponse::Ok().json(person))
}

#[delete("/parties/{id}/people/{person}")]
async fn delete_person(store: Store, path: web::Path<(String, String)>) -> Result<HttpResponse> {
    let (id, person_id) = path.into_inner();
    let person = modify(&store, &id, |party| party.remove_person(&person_id)).await?;
    tracing::debug!(party = %id, person = %person.id, "person removed");
    Ok(HttpResponse::NoContent().finish())
}

#[post("/parties/{id}/items")]
async fn add_item(
    store: Store,
    id: web::Path<String>,
    json: web::Json<NewItem>,
) -> Result<HttpResponse> {
    let item = modify(&store, &id, |party| party.add_item(json.into_inner())).await?;
    tracing::debug!(party = %id, item = %item.id, "item added");
    Ok(HttpResponse::Created().json(item))
}

#[patch("/parties/{id}/items/{item}")]
async fn update_item(
    store: Store,
    path: web::Path<(String, String)>,
    json: web::Json<ItemUpdate>,
) -> Result<HttpResponse> {
    let (id, item_id) = path.into_inner();
    let item = modify(&store, &id, |party| {
        party.update_item(&item_id, json.into_inner())
    })
    .await?;
    Ok(HttpResponse::Ok().json(item))
}

#[delete("/parties/{id}/items/{item}")]
async fn delete_item(store: Store, path: web::Path<(String, String)>) -> Result<HttpResponse> {
    let (id, item_id) = path.into_inner();
    modify(&store, &id, |party| party.remove_item(&item_id)).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[put("/parties/{id}/people/{person}/excluded-items/{item}")]
async fn exclude_item(
    store: Store,
    path: web::Path<(String, String, String)>,
) -> Result<HttpResponse> {
    let (id, person_id, item_id) = path.into_inner();
    let item = modify(&store, &id, |party| party.exclude_item(&person_id, &item_id)).await?;
    tracing::debug!(party = %id, person = %person_id, item = %item.id, "item opted out");
    Ok(HttpResponse::Ok().json(item))
}

#[delete("/parties/{id}/people/{person}/excluded-items/{item}")]
async fn include_item(
    store: Store,
    path: web::Path<(String, String, String)>,
) -> Result<HttpResponse> {
    let (id, person_id, item_id) = path.into_inner();
    let item = modify(&store, &id, |party| party.include_item(&person_id, &item_id)).await?;
    Ok(HttpResponse::Ok().json(item))
}

#[get("/parties/{id}/summary")]
async fn get_summary(store: Store, id: web::Path<String>) -> Result<HttpResponse> {
    let party = load(&store, &id).await?;
    Ok(HttpResponse::Ok().json(PartyReport::summary_only(&party)?))
}

#[get("/parties/{id}/payments")]
async fn get_payments(store: Store, id: web::Path<String>) -> Result<HttpResponse> {
    let party = load(&store, &id).await?;
    Ok(HttpResponse::Ok().json(party.payments()?))
}

#[get("/parties/{id}/people/{person}/payments")]
async fn get_person_payments(
    store: Store,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse> {
    let (id, person_id) = path.into_inner();
    let party = load(&store, &id).await?;
    party.person(&person_id)?;
    let payments = party.payments()?;
    Ok(HttpResponse::Ok().json(PersonPayments::for_person(&payments, &person_id)))
}

#[get("/parties/{id}/report")]
async fn get_report(store: Store, id: web::Path<String>) -> Result<HttpResponse> {
    let party = load(&store, &id).await?;
    Ok(HttpResponse::Ok().json(PartyReport::full(&party)?))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(create_party)
        .service(list_parties)
        .service(get_party)
        .service(update_party)
        .service(delete_party)
        .service(add_person)
        .service(get_person_payments)
        .service(get_person)
        .service(update_person)
        .service(delete_person)
        .service(add_item)
        .service(update_item)
        .service(delete_item)
        .service(exclude_item)
        .service(include_item)
        .service(get_summary)
        .service(get_payments)
        .service(get_report);
}
