//! Animal registry.

use tracing::info;

use crate::db::Database;
use crate::error::{require_text, CoreError, CoreResult};
use crate::models::{Animal, NewAnimal};

pub struct AnimalRegistry<'a> {
    db: &'a Database,
}

impl<'a> AnimalRegistry<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Register an animal. The `animal_id` label must be unused.
    pub fn register_animal(&self, new: NewAnimal) -> CoreResult<Animal> {
        require_text("animal_id", &new.animal_id)?;
        require_text("species", &new.species)?;
        if let Some(weight) = new.weight {
            if !weight.is_finite() || weight <= 0.0 {
                return Err(CoreError::validation("weight", format!("{weight} must be positive")));
            }
        }

        let animal = Animal::from_new(new);
        self.db.insert_animal(&animal)?;
        info!(id = %animal.id, animal_id = %animal.animal_id, "animal registered");
        Ok(animal)
    }

    pub fn list_animals(&self) -> CoreResult<Vec<Animal>> {
        Ok(self.db.list_animals()?)
    }

    pub fn get_animal(&self, id: &str) -> CoreResult<Animal> {
        self.db
            .get_animal(id)?
            .ok_or_else(|| CoreError::not_found("Animal", id))
    }
}
