//! Typed rows of the movies dataset

use rand::Rng;
use serde::Serialize;
use sqlx::FromRow;

use crate::seed::Faker;

/// Row of `"Movie"`
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Movie {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub year: i32,
}

/// Row of `"Person"`, the real identity behind actors
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Person {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
}

/// Row of `"Actor"`. Movies are linked through `"_ActorToMovie"`.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Actor {
    pub id: i32,
    pub name: String,
    pub person_id: i32,
}

/// Row of `"User"`, the authors of reviews
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct User {
    pub id: i32,
    pub name: String,
}

/// Row of `"Review"`
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Review {
    pub id: i32,
    pub body: String,
    /// Between 1 and 10
    pub rating: i32,
    pub author_id: i32,
    pub movie_id: i32,
}

/// An actor together with the movie it was loaded for
#[derive(Debug, Clone, FromRow)]
pub struct CastMember {
    pub movie_id: i32,
    #[sqlx(flatten)]
    pub actor: Actor,
}

/// Fields rewritten by the update scenario
#[derive(Debug, Clone, PartialEq)]
pub struct MoviePatch {
    pub year: i32,
    pub title: String,
    pub description: String,
}

impl MoviePatch {
    /// Id of the movie rewritten on every update iteration
    pub const TARGET_ID: i32 = 50;

    /// Random patch in the same shape as the seeded movies
    pub fn random<R: Rng>(faker: &mut Faker<R>) -> Self {
        MoviePatch {
            year: faker.year(),
            title: faker.words(4),
            description: faker.words(30),
        }
    }
}
