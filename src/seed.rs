//! Sample dataset
//!
//! Creates the movies schema and fills it with a deterministic dataset:
//! 50k movies, 100k people, 100k actors, 100k users and 500k reviews. Every
//! run with the same seed produces the same rows, so results stay
//! comparable across machines.

use std::collections::BTreeSet;

use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sqlx::PgPool;

use crate::backend::models::{Actor, Movie, Person, Review, User};
use crate::errors::Result;

pub const N_MOVIES: i32 = 50_000;
pub const N_PEOPLE: i32 = 100_000;
pub const N_ACTORS: i32 = 100_000;
pub const N_USERS: i32 = 100_000;
pub const N_REVIEWS: i32 = 500_000;

/// Seed used when none is given on the command line
pub const DEFAULT_SEED: u64 = 42;

/// Rows per INSERT statement
const BATCH_SIZE: usize = 10_000;

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS "Movie" (
        id SERIAL PRIMARY KEY,
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        year INTEGER NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS "Person" (
        id SERIAL PRIMARY KEY,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS "Actor" (
        id SERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        person_id INTEGER NOT NULL REFERENCES "Person"(id)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS "_ActorToMovie" (
        "A" INTEGER NOT NULL REFERENCES "Actor"(id) ON DELETE CASCADE,
        "B" INTEGER NOT NULL REFERENCES "Movie"(id) ON DELETE CASCADE,
        PRIMARY KEY ("A", "B")
    )"#,
    r#"CREATE INDEX IF NOT EXISTS "_ActorToMovie_B_index" ON "_ActorToMovie"("B")"#,
    r#"CREATE TABLE IF NOT EXISTS "User" (
        id SERIAL PRIMARY KEY,
        name TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS "Review" (
        id SERIAL PRIMARY KEY,
        body TEXT NOT NULL,
        rating INTEGER NOT NULL,
        author_id INTEGER NOT NULL REFERENCES "User"(id),
        movie_id INTEGER NOT NULL REFERENCES "Movie"(id)
    )"#,
    r#"CREATE INDEX IF NOT EXISTS "Review_movie_id_index" ON "Review"(movie_id)"#,
    r#"CREATE INDEX IF NOT EXISTS "Review_author_id_index" ON "Review"(author_id)"#,
];

const DROP_SCHEMA: &str =
    r#"DROP TABLE IF EXISTS "Review", "User", "_ActorToMovie", "Actor", "Person", "Movie" CASCADE"#;

const WORDS: &[&str] = &[
    "amber", "anchor", "angle", "arrow", "autumn", "azure", "badge", "bamboo", "beacon", "berry",
    "black", "blue", "bottle", "breeze", "bridge", "bronze", "cabin", "candle", "canyon", "carbon",
    "castle", "cedar", "chalk", "cherry", "circle", "cloud", "cobalt", "comet", "copper", "coral",
    "crimson", "crystal", "cyan", "dawn", "delta", "desert", "diamond", "dream", "dune", "eagle",
    "echo", "ember", "emerald", "engine", "falcon", "feather", "field", "flame", "forest", "fossil",
    "fountain", "frost", "galaxy", "garden", "garnet", "ghost", "glacier", "gold", "granite", "green",
    "harbor", "hazel", "horizon", "indigo", "island", "ivory", "jade", "jasmine", "jungle", "lagoon",
    "lantern", "lava", "lemon", "lilac", "lime", "lotus", "magenta", "maple", "marble", "meadow",
    "meteor", "mint", "mirror", "moon", "mountain", "navy", "nebula", "ocean", "olive", "onyx",
    "orange", "orchid", "pearl", "pepper", "pine", "planet", "plum", "prairie", "purple", "quartz",
    "rain", "raven", "red", "reef", "river", "rocket", "ruby", "saffron", "salmon", "sand",
    "sapphire", "scarlet", "shadow", "silver", "sky", "slate", "snow", "spark", "spring", "star",
    "stone", "storm", "summer", "sun", "teal", "thunder", "tiger", "timber", "topaz", "tulip",
    "turquoise", "valley", "velvet", "violet", "volcano", "wave", "white", "willow", "winter", "yellow",
];

const FIRST_NAMES: &[&str] = &[
    "Ada", "Alan", "Alice", "Amara", "Andre", "Bea", "Boris", "Carla", "Chen", "Dario", "Elena",
    "Emil", "Farah", "Felix", "Greta", "Hana", "Hugo", "Ines", "Ivan", "Jonas", "Kai", "Lara",
    "Leo", "Maya", "Mateo", "Nadia", "Nils", "Olga", "Omar", "Priya", "Quinn", "Rosa", "Sami",
    "Sofia", "Tariq", "Uma", "Vera", "Wim", "Yara", "Zoe",
];

const LAST_NAMES: &[&str] = &[
    "Abbott", "Bauer", "Castillo", "Dubois", "Eriksen", "Fischer", "Garcia", "Hoffman", "Ito",
    "Jensen", "Kowalski", "Larsen", "Moreau", "Nakamura", "Okafor", "Petrov", "Quintero", "Rossi",
    "Schmidt", "Tanaka", "Ueda", "Varga", "Weber", "Xu", "Yilmaz", "Zimmer",
];

/// Generator of random but plausible values
pub struct Faker<R> {
    rng: R,
}

impl Faker<StdRng> {
    /// Deterministic generator
    pub fn seeded(seed: u64) -> Self {
        Faker::new(StdRng::seed_from_u64(seed))
    }

    /// Generator seeded from the operating system
    pub fn from_entropy() -> Self {
        Faker::new(StdRng::from_entropy())
    }
}

impl<R: Rng> Faker<R> {
    pub fn new(rng: R) -> Self {
        Faker { rng }
    }

    /// `count` random words separated by spaces
    pub fn words(&mut self, count: usize) -> String {
        (0..count)
            .map(|_| self.pick(WORDS))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Release year between 1950 and 2029
    pub fn year(&mut self) -> i32 {
        self.rng.gen_range(1950..2030)
    }

    pub fn first_name(&mut self) -> String {
        self.pick(FIRST_NAMES).to_string()
    }

    pub fn last_name(&mut self) -> String {
        self.pick(LAST_NAMES).to_string()
    }

    pub fn full_name(&mut self) -> String {
        format!("{} {}", self.first_name(), self.last_name())
    }

    /// Lowercase handle such as `maya.rossi42`
    pub fn user_name(&mut self) -> String {
        let first = self.pick(FIRST_NAMES).to_lowercase();
        let last = self.pick(LAST_NAMES).to_lowercase();
        format!("{}.{}{}", first, last, self.rng.gen_range(0..100))
    }

    /// Integer in `min..=max`
    pub fn number(&mut self, min: i32, max: i32) -> i32 {
        self.rng.gen_range(min..=max)
    }

    fn pick(&mut self, values: &[&'static str]) -> &'static str {
        values[self.rng.gen_range(0..values.len())]
    }
}

pub fn generate_movies<R: Rng>(faker: &mut Faker<R>, count: i32) -> Vec<Movie> {
    (0..=count)
        .map(|id| Movie {
            id,
            title: faker.words(4),
            description: faker.words(30),
            year: faker.year(),
        })
        .collect()
}

pub fn generate_people<R: Rng>(faker: &mut Faker<R>, count: i32) -> Vec<Person> {
    (0..=count)
        .map(|id| Person {
            id,
            first_name: faker.first_name(),
            last_name: faker.last_name(),
        })
        .collect()
}

/// Actors with the movies they played in. Each actor is linked to up to 31
/// distinct movies.
pub fn generate_actors<R: Rng>(
    faker: &mut Faker<R>,
    count: i32,
    people: i32,
    movies: i32,
) -> Vec<(Actor, BTreeSet<i32>)> {
    (0..=count)
        .map(|id| {
            let actor = Actor {
                id,
                name: faker.full_name(),
                person_id: faker.number(1, people),
            };
            let links = faker.number(10, 30);
            let movie_ids: BTreeSet<i32> = (0..=links).map(|_| faker.number(1, movies)).collect();
            (actor, movie_ids)
        })
        .collect()
}

pub fn generate_users<R: Rng>(faker: &mut Faker<R>, count: i32) -> Vec<User> {
    (0..=count)
        .map(|id| User {
            id,
            name: faker.user_name(),
        })
        .collect()
}

pub fn generate_reviews<R: Rng>(
    faker: &mut Faker<R>,
    count: i32,
    users: i32,
    movies: i32,
) -> Vec<Review> {
    (0..=count)
        .map(|id| Review {
            id,
            body: faker.words(30),
            rating: faker.number(1, 10),
            author_id: faker.number(0, users),
            movie_id: faker.number(0, movies),
        })
        .collect()
}

/// Seeding options
#[derive(Debug, Clone)]
pub struct SeedOptions {
    pub seed: u64,
    /// Drop existing tables first
    pub reset: bool,
}

impl Default for SeedOptions {
    fn default() -> Self {
        SeedOptions {
            seed: DEFAULT_SEED,
            reset: false,
        }
    }
}

/// Create the schema and insert the whole dataset
pub async fn seed(pool: &PgPool, options: &SeedOptions) -> Result<()> {
    if options.reset {
        info!("Dropping existing tables...");
        sqlx::query(DROP_SCHEMA).execute(pool).await?;
    }

    info!("Creating schema...");
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }

    // One generator for the whole dataset, so the insert order fixes every row
    let mut faker = Faker::seeded(options.seed);

    info!("Seeding movies...");
    insert_movies(pool, &generate_movies(&mut faker, N_MOVIES)).await?;

    info!("Seeding people...");
    insert_people(pool, &generate_people(&mut faker, N_PEOPLE)).await?;

    // Actors reference people and movies, both must exist first
    info!("Seeding actors...");
    insert_actors(pool, &generate_actors(&mut faker, N_ACTORS, N_PEOPLE, N_MOVIES)).await?;

    info!("Seeding users...");
    insert_users(pool, &generate_users(&mut faker, N_USERS)).await?;

    // Reviews reference users and movies
    info!("Seeding reviews...");
    insert_reviews(pool, &generate_reviews(&mut faker, N_REVIEWS, N_USERS, N_MOVIES)).await?;

    // Ids were set explicitly, so the sequences never advanced.
    info!("Updating sequences...");
    futures::future::try_join_all(
        ["Movie", "Actor", "Person", "Review", "User"]
            .into_iter()
            .map(|table| update_sequence(pool, table)),
    )
    .await?;

    info!("Done!");
    Ok(())
}

async fn insert_movies(pool: &PgPool, movies: &[Movie]) -> Result<()> {
    for chunk in movies.chunks(BATCH_SIZE) {
        sqlx::query(
            r#"INSERT INTO "Movie" (id, title, description, year)
               SELECT * FROM UNNEST($1::int4[], $2::text[], $3::text[], $4::int4[])"#,
        )
        .bind(chunk.iter().map(|m| m.id).collect::<Vec<_>>())
        .bind(chunk.iter().map(|m| m.title.clone()).collect::<Vec<_>>())
        .bind(chunk.iter().map(|m| m.description.clone()).collect::<Vec<_>>())
        .bind(chunk.iter().map(|m| m.year).collect::<Vec<_>>())
        .execute(pool)
        .await?;
    }
    Ok(())
}

async fn insert_people(pool: &PgPool, people: &[Person]) -> Result<()> {
    for chunk in people.chunks(BATCH_SIZE) {
        sqlx::query(
            r#"INSERT INTO "Person" (id, first_name, last_name)
               SELECT * FROM UNNEST($1::int4[], $2::text[], $3::text[])"#,
        )
        .bind(chunk.iter().map(|p| p.id).collect::<Vec<_>>())
        .bind(chunk.iter().map(|p| p.first_name.clone()).collect::<Vec<_>>())
        .bind(chunk.iter().map(|p| p.last_name.clone()).collect::<Vec<_>>())
        .execute(pool)
        .await?;
    }
    Ok(())
}

async fn insert_actors(pool: &PgPool, actors: &[(Actor, BTreeSet<i32>)]) -> Result<()> {
    for (n, chunk) in actors.chunks(BATCH_SIZE).enumerate() {
        info!("Seeding actor: {}", n * BATCH_SIZE);

        sqlx::query(
            r#"INSERT INTO "Actor" (id, name, person_id)
               SELECT * FROM UNNEST($1::int4[], $2::text[], $3::int4[])"#,
        )
        .bind(chunk.iter().map(|(a, _)| a.id).collect::<Vec<_>>())
        .bind(chunk.iter().map(|(a, _)| a.name.clone()).collect::<Vec<_>>())
        .bind(chunk.iter().map(|(a, _)| a.person_id).collect::<Vec<_>>())
        .execute(pool)
        .await?;

        let (actor_ids, movie_ids): (Vec<i32>, Vec<i32>) = chunk
            .iter()
            .flat_map(|(a, movies)| movies.iter().map(move |m| (a.id, *m)))
            .unzip();

        sqlx::query(
            r#"INSERT INTO "_ActorToMovie" ("A", "B")
               SELECT * FROM UNNEST($1::int4[], $2::int4[])
               ON CONFLICT DO NOTHING"#,
        )
        .bind(actor_ids)
        .bind(movie_ids)
        .execute(pool)
        .await?;
    }
    Ok(())
}

async fn insert_users(pool: &PgPool, users: &[User]) -> Result<()> {
    for chunk in users.chunks(BATCH_SIZE) {
        sqlx::query(
            r#"INSERT INTO "User" (id, name)
               SELECT * FROM UNNEST($1::int4[], $2::text[])"#,
        )
        .bind(chunk.iter().map(|u| u.id).collect::<Vec<_>>())
        .bind(chunk.iter().map(|u| u.name.clone()).collect::<Vec<_>>())
        .execute(pool)
        .await?;
    }
    Ok(())
}

async fn insert_reviews(pool: &PgPool, reviews: &[Review]) -> Result<()> {
    for chunk in reviews.chunks(BATCH_SIZE) {
        sqlx::query(
            r#"INSERT INTO "Review" (id, body, rating, author_id, movie_id)
               SELECT * FROM UNNEST($1::int4[], $2::text[], $3::int4[], $4::int4[], $5::int4[])"#,
        )
        .bind(chunk.iter().map(|r| r.id).collect::<Vec<_>>())
        .bind(chunk.iter().map(|r| r.body.clone()).collect::<Vec<_>>())
        .bind(chunk.iter().map(|r| r.rating).collect::<Vec<_>>())
        .bind(chunk.iter().map(|r| r.author_id).collect::<Vec<_>>())
        .bind(chunk.iter().map(|r| r.movie_id).collect::<Vec<_>>())
        .execute(pool)
        .await?;
    }
    Ok(())
}

async fn update_sequence(pool: &PgPool, table: &str) -> Result<()> {
    let quoted = format!("\"{table}\"");
    sqlx::query(&format!(
        "SELECT setval(pg_get_serial_sequence($1, 'id'), (SELECT MAX(id) FROM {quoted}))"
    ))
    .bind(&quoted)
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_data() {
        let a = generate_movies(&mut Faker::seeded(DEFAULT_SEED), 100);
        let b = generate_movies(&mut Faker::seeded(DEFAULT_SEED), 100);
        assert_eq!(a, b);

        let c = generate_movies(&mut Faker::seeded(7), 100);
        assert_ne!(a, c);
    }

    #[test]
    fn test_movie_shape() {
        let movies = generate_movies(&mut Faker::seeded(DEFAULT_SEED), 50);

        assert_eq!(movies.len(), 51);
        assert_eq!(movies.first().unwrap().id, 0);
        assert_eq!(movies.last().unwrap().id, 50);
        for movie in &movies {
            assert_eq!(movie.title.split(' ').count(), 4);
            assert_eq!(movie.description.split(' ').count(), 30);
            assert!((1950..2030).contains(&movie.year));
        }
    }

    #[test]
    fn test_actor_links_are_distinct_and_in_range() {
        let actors = generate_actors(&mut Faker::seeded(DEFAULT_SEED), 200, 500, 1000);

        for (actor, movies) in &actors {
            assert!((1..=500).contains(&actor.person_id));
            assert!(!movies.is_empty() && movies.len() <= 31);
            assert!(movies.iter().all(|id| (1..=1000).contains(id)));
        }
    }

    #[test]
    fn test_reviews_reference_existing_rows() {
        let reviews = generate_reviews(&mut Faker::seeded(DEFAULT_SEED), 1000, 10, 20);

        for review in &reviews {
            assert!((1..=10).contains(&review.rating));
            assert!((0..=10).contains(&review.author_id));
            assert!((0..=20).contains(&review.movie_id));
        }
    }

    #[test]
    fn test_filter_word_occurs_in_titles() {
        let movies = generate_movies(&mut Faker::seeded(DEFAULT_SEED), 5000);
        assert!(movies.iter().any(|m| m.title.contains("cyan")));
    }
}
