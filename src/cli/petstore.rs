//! In-memory pet store served by the `typedapi-petstore` binary.

use crate::dispatcher::Arguments;
use crate::generator::{ApiDefinition, ArgumentDefinition, OpenApi, OperationDefinition, ReturnType};
use crate::schema::{Describe, EnumSchema, ListSchema, Schema, ShapeSchema, StringSchema};
use crate::security::{Credential, StaticCredentialsProvider};
use crate::server::{CreatedResponse, HandlerError, HandlerOutput, NotFoundResponse};
use crate::spec::{ApiKeyLocation, OpenApiDocument, SecurityRequirement, SecurityScheme};
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use tracing::info;

/// Key accepted in the `X-Api-Key` header for write operations.
pub const DEMO_API_KEY: &str = "petstore-demo-key";
pub const WRITE_SCOPE: &str = "pets:write";
const DEFAULT_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PetStatus {
    Available,
    Pending,
    Sold,
}

impl Describe for PetStatus {
    fn schema() -> Schema {
        EnumSchema::new("PetStatus", ["available", "pending", "sold"])
            .description("Sales status of a pet")
            .into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pet {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub status: PetStatus,
}

impl Describe for Pet {
    fn schema() -> Schema {
        ShapeSchema::new("Pet")
            .field::<i64>("id")
            .property("name", pet_name())
            .field::<Option<String>>("tag")
            .field::<PetStatus>("status")
            .into()
    }
}

/// A page of pets.
pub struct Pets;

impl Describe for Pets {
    fn schema() -> Schema {
        ListSchema::named("Pets", Pet::schema()).max_count(100).into()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewPet {
    pub name: String,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub status: Option<PetStatus>,
}

impl Describe for NewPet {
    fn schema() -> Schema {
        ShapeSchema::new("NewPet")
            .description("A pet to be added to the store")
            .property("name", pet_name())
            .field::<Option<String>>("tag")
            .field::<Option<PetStatus>>("status")
            .into()
    }
}

fn pet_name() -> Schema {
    StringSchema::new("PetName").min_length(1).max_length(64).into()
}

#[derive(Debug)]
pub struct PetStore {
    pets: RwLock<Vec<Pet>>,
}

impl Default for PetStore {
    fn default() -> Self {
        let seed = [
            (1, "Rex", Some("dog"), PetStatus::Available),
            (2, "Tom", Some("cat"), PetStatus::Sold),
            (3, "Nemo", None, PetStatus::Pending),
        ];
        Self::with_pets(
            seed.into_iter()
                .map(|(id, name, tag, status)| Pet {
                    id,
                    name: name.to_string(),
                    tag: tag.map(str::to_string),
                    status,
                })
                .collect(),
        )
    }
}

impl PetStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_pets(pets: Vec<Pet>) -> Self {
        Self {
            pets: RwLock::new(pets),
        }
    }

    /// Credentials matching the `apiKey` scheme of `document`.
    #[must_use]
    pub fn authentication_provider(document: &OpenApiDocument) -> StaticCredentialsProvider {
        StaticCredentialsProvider::for_document(document).credential(
            "apiKey",
            Credential::new(DEMO_API_KEY, "demo").scopes([WRITE_SCOPE]),
        )
    }

    fn list_pets(&self, args: &Arguments) -> Result<HandlerOutput, HandlerError> {
        let limit = args.optional::<usize>("limit")?.unwrap_or(DEFAULT_LIMIT);
        let status = args.optional::<PetStatus>("status")?;
        let pets = self.read()?;
        let page: Vec<&Pet> = pets
            .iter()
            .filter(|pet| status.is_none_or(|s| pet.status == s))
            .take(limit)
            .collect();
        HandlerOutput::json(&page)
    }

    fn pet_by_id(&self, args: &Arguments) -> Result<HandlerOutput, HandlerError> {
        let id: i64 = args.get("id")?;
        match self.read()?.iter().find(|pet| pet.id == id) {
            Some(pet) => HandlerOutput::json(pet),
            None => Ok(HandlerOutput::wrap(NotFoundResponse::new())),
        }
    }

    fn add_pet(&self, args: &Arguments) -> Result<HandlerOutput, HandlerError> {
        let new_pet: NewPet = args.get("pet")?;
        let added_by = args
            .authentication()
            .map(|ctx| ctx.subject.clone())
            .unwrap_or_default();
        let mut pets = self
            .pets
            .write()
            .map_err(|_| anyhow!("pet store lock poisoned"))?;
        let id = pets.iter().map(|pet| pet.id).max().unwrap_or(0) + 1;
        pets.push(Pet {
            id,
            name: new_pet.name,
            tag: new_pet.tag,
            status: new_pet.status.unwrap_or(PetStatus::Available),
        });
        info!(pet_id = id, added_by = %added_by, "Pet added");
        Ok(HandlerOutput::wrap(
            CreatedResponse::new().with_header("location", format!("/pets/{id}")),
        ))
    }

    fn delete_pet(&self, args: &Arguments) -> Result<HandlerOutput, HandlerError> {
        let id: i64 = args.get("id")?;
        let mut pets = self
            .pets
            .write()
            .map_err(|_| anyhow!("pet store lock poisoned"))?;
        let before = pets.len();
        pets.retain(|pet| pet.id != id);
        if pets.len() == before {
            return Ok(HandlerOutput::wrap(NotFoundResponse::new()));
        }
        Ok(HandlerOutput::Empty)
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Vec<Pet>>, HandlerError> {
        self.pets
            .read()
            .map_err(|_| anyhow!("pet store lock poisoned"))
    }
}

impl OpenApi for PetStore {
    fn definition() -> ApiDefinition<Self> {
        ApiDefinition::new()
            .title("Pet Store API")
            .version("1.0.0")
            .description("A small in-memory pet store")
            .security_scheme(
                "apiKey",
                SecurityScheme::api_key("X-Api-Key", ApiKeyLocation::Header),
            )
            .operation(
                OperationDefinition::get("listPets", "/pets")
                    .summary("List pets")
                    .tag("pets")
                    .argument(
                        ArgumentDefinition::of::<Option<usize>>("limit")
                            .description("Maximum number of pets to return")
                            .default(DEFAULT_LIMIT),
                    )
                    .argument(ArgumentDefinition::of::<Option<PetStatus>>("status"))
                    .returns(ReturnType::of::<Pets>())
                    .handler(PetStore::list_pets),
            )
            .operation(
                OperationDefinition::post("addPet", "/pets")
                    .summary("Add a pet")
                    .tag("pets")
                    .security(SecurityRequirement::scheme("apiKey"))
                    .argument(ArgumentDefinition::of::<NewPet>("pet"))
                    .argument(ArgumentDefinition::authentication("auth"))
                    .returns(ReturnType::response::<CreatedResponse>())
                    .handler(PetStore::add_pet),
            )
            .operation(
                OperationDefinition::get("petById", "/pets/{id}")
                    .summary("Find a pet by id")
                    .tag("pets")
                    .argument(ArgumentDefinition::of::<i64>("id").description("Pet identifier"))
                    .returns(ReturnType::of::<Pet>().or(ReturnType::response::<NotFoundResponse>()))
                    .handler(PetStore::pet_by_id),
            )
            .operation(
                OperationDefinition::delete("deletePet", "/pets/{id}")
                    .summary("Remove a pet")
                    .tag("pets")
                    .security(SecurityRequirement::scoped("apiKey", [WRITE_SCOPE]))
                    .argument(ArgumentDefinition::of::<i64>("id"))
                    .returns(ReturnType::Void.or(ReturnType::response::<NotFoundResponse>()))
                    .handler(PetStore::delete_pet),
            )
    }
}
