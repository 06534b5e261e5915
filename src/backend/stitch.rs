//! Relation stitching scenarios
//!
//! Rows are decoded into typed models, relations are fetched with one query
//! per level and joined in process before being serialized.

use std::collections::HashMap;

use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;

use crate::backend::json::{M2M_MOVIE_ID, ONE2M_MOVIE_ID};
use crate::backend::models::{Actor, CastMember, Movie, MoviePatch, Person, Review};
use crate::errors::Result;
use crate::runner::{BenchResult, BenchTable};
use crate::scenario::Scenario;
use crate::seed::Faker;

const MOVIE_COLUMNS: &str = "m.id, m.title, m.description, m.year";

const CAST_FOR_MOVIES: &str = r#"
SELECT am."B" AS movie_id, a.id, a.name, a.person_id
FROM "_ActorToMovie" am JOIN "Actor" a ON a.id = am."A"
WHERE am."B" = ANY($1)
ORDER BY a.id"#;

const CAST_FOR_MOVIE_LIMIT: &str = r#"
SELECT am."B" AS movie_id, a.id, a.name, a.person_id
FROM "_ActorToMovie" am JOIN "Actor" a ON a.id = am."A"
WHERE am."B" = $1
ORDER BY a.id LIMIT 3"#;

const PEOPLE_BY_ID: &str = r#"SELECT id, first_name, last_name FROM "Person" WHERE id = ANY($1)"#;

const REVIEWS_FOR_MOVIE_LIMIT: &str = r#"
SELECT id, body, rating, author_id, movie_id FROM "Review"
WHERE movie_id = $1 ORDER BY id LIMIT 3"#;

/// Every scenario except the deeply nested actor details
pub fn benches() -> BenchTable<PgPool> {
    BenchTable::new()
        .with(Scenario::FindManyAll, find_many_all)
        .with(Scenario::FindManyAllLimit, find_many_all_limit)
        .with(Scenario::FindManyAllLimitFilter, find_many_all_limit_filter)
        .with(Scenario::FindManyFiftyMostRecentMovieTitleAsc, find_many_fifty_most_recent)
        .with(Scenario::UpdateOneMovie, update_one_movie)
        .with(Scenario::FindManyM2mCastLimit, find_many_m2m_cast_limit)
        .with(Scenario::FindManyM2mCastLimitFilter, find_many_m2m_cast_limit_filter)
        .with(
            Scenario::FindManyM2mCastAndToOnePersonLimitFilter,
            find_many_m2m_cast_and_person_limit_filter,
        )
        .with(Scenario::FindManyMovieWhereReviewsAuthor, find_many_movie_where_reviews_author)
        .with(Scenario::FindManyMovieWhereCastPerson, find_many_movie_where_cast_person)
        .with(Scenario::FindManyReviewWhereAuthor, find_many_review_where_author)
        .with(
            Scenario::FindManyActorWhereMoviesReviewsAuthor,
            find_many_actor_where_movies_reviews_author,
        )
        .with(Scenario::FindUniqueOne2mLimit, find_unique_one2m_limit)
        .with(Scenario::FindUniqueM2mCastLimit, find_unique_m2m_cast_limit)
}

/// Serialize typed rows into the normalized result
fn to_result<T: Serialize>(rows: &[T]) -> Result<BenchResult> {
    let data = rows
        .iter()
        .map(serde_json::to_value)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(BenchResult::new(data))
}

/// Serialize `parent` with an extra `key` holding `children`
fn with_relation<P: Serialize, C: Serialize>(parent: &P, key: &str, children: &[C]) -> Result<Value> {
    let mut value = serde_json::to_value(parent)?;
    if let Value::Object(map) = &mut value {
        map.insert(key.to_string(), serde_json::to_value(children)?);
    }
    Ok(value)
}

async fn movies(pool: &PgPool, clause: &str) -> Result<Vec<Movie>> {
    let sql = format!(r#"SELECT {MOVIE_COLUMNS} FROM "Movie" m {clause}"#);
    let movies = sqlx::query_as::<_, Movie>(&sql).fetch_all(pool).await?;
    Ok(movies)
}

/// Cast members of every movie, grouped by movie id
async fn cast_by_movie(pool: &PgPool, movies: &[Movie]) -> Result<HashMap<i32, Vec<Actor>>> {
    let ids: Vec<i32> = movies.iter().map(|m| m.id).collect();
    let rows = sqlx::query_as::<_, CastMember>(CAST_FOR_MOVIES)
        .bind(ids)
        .fetch_all(pool)
        .await?;

    let mut cast: HashMap<i32, Vec<Actor>> = HashMap::new();
    for row in rows {
        cast.entry(row.movie_id).or_default().push(row.actor);
    }
    Ok(cast)
}

async fn people_by_id(pool: &PgPool, ids: Vec<i32>) -> Result<HashMap<i32, Person>> {
    let people = sqlx::query_as::<_, Person>(PEOPLE_BY_ID)
        .bind(ids)
        .fetch_all(pool)
        .await?;
    Ok(people.into_iter().map(|p| (p.id, p)).collect())
}

async fn movies_with_cast(pool: &PgPool, clause: &str) -> Result<BenchResult> {
    let movies = movies(pool, clause).await?;
    let cast = cast_by_movie(pool, &movies).await?;

    let data = movies
        .iter()
        .map(|movie| {
            let members = cast.get(&movie.id).map(Vec::as_slice).unwrap_or_default();
            with_relation(movie, "cast", members)
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(BenchResult::new(data))
}

async fn movies_with_cast_and_people(pool: &PgPool, clause: &str) -> Result<BenchResult> {
    let movies = movies(pool, clause).await?;
    let cast = cast_by_movie(pool, &movies).await?;
    let person_ids: Vec<i32> = cast
        .values()
        .flatten()
        .map(|actor| actor.person_id)
        .collect();
    let people = people_by_id(pool, person_ids).await?;

    let mut data = Vec::with_capacity(movies.len());
    for movie in &movies {
        let members = cast
            .get(&movie.id)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(|actor| with_relation_one(actor, "person", people.get(&actor.person_id)))
            .collect::<Result<Vec<_>>>()?;
        data.push(with_relation(movie, "cast", &members)?);
    }
    Ok(BenchResult::new(data))
}

/// Serialize `parent` with an extra `key` holding an optional child
fn with_relation_one<P: Serialize, C: Serialize>(parent: &P, key: &str, child: Option<&C>) -> Result<Value> {
    let mut value = serde_json::to_value(parent)?;
    if let Value::Object(map) = &mut value {
        map.insert(key.to_string(), serde_json::to_value(child)?);
    }
    Ok(value)
}

fn find_many_all(pool: &PgPool) -> BoxFuture<'_, Result<BenchResult>> {
    Box::pin(async move { to_result(&movies(pool, "").await?) })
}

fn find_many_all_limit(pool: &PgPool) -> BoxFuture<'_, Result<BenchResult>> {
    Box::pin(async move { to_result(&movies(pool, "ORDER BY m.id LIMIT 2000").await?) })
}

fn find_many_all_limit_filter(pool: &PgPool) -> BoxFuture<'_, Result<BenchResult>> {
    Box::pin(async move {
        to_result(&movies(pool, "WHERE m.title LIKE '%cyan%' ORDER BY m.id LIMIT 2000").await?)
    })
}

fn find_many_fifty_most_recent(pool: &PgPool) -> BoxFuture<'_, Result<BenchResult>> {
    Box::pin(async move {
        to_result(&movies(pool, "ORDER BY m.year DESC, m.title ASC LIMIT 50").await?)
    })
}

fn update_one_movie(pool: &PgPool) -> BoxFuture<'_, Result<BenchResult>> {
    Box::pin(async move {
        let patch = MoviePatch::random(&mut Faker::from_entropy());
        let movie = sqlx::query_as::<_, Movie>(
            r#"UPDATE "Movie" SET year = $2, title = $3, description = $4
               WHERE id = $1
               RETURNING id, title, description, year"#,
        )
        .bind(MoviePatch::TARGET_ID)
        .bind(patch.year)
        .bind(patch.title)
        .bind(patch.description)
        .fetch_optional(pool)
        .await?;

        Ok(BenchResult::unique(movie.map(serde_json::to_value).transpose()?))
    })
}

fn find_many_m2m_cast_limit(pool: &PgPool) -> BoxFuture<'_, Result<BenchResult>> {
    Box::pin(movies_with_cast(pool, "ORDER BY m.id LIMIT 2000"))
}

fn find_many_m2m_cast_limit_filter(pool: &PgPool) -> BoxFuture<'_, Result<BenchResult>> {
    Box::pin(movies_with_cast(
        pool,
        "WHERE m.title LIKE '%cyan%' ORDER BY m.id LIMIT 2000",
    ))
}

fn find_many_m2m_cast_and_person_limit_filter(pool: &PgPool) -> BoxFuture<'_, Result<BenchResult>> {
    Box::pin(movies_with_cast_and_people(
        pool,
        "WHERE m.title LIKE '%cyan%' ORDER BY m.id LIMIT 2000",
    ))
}

fn find_many_movie_where_reviews_author(pool: &PgPool) -> BoxFuture<'_, Result<BenchResult>> {
    Box::pin(async move {
        let movies = movies(
            pool,
            r#"WHERE EXISTS (
                SELECT 1 FROM "Review" r JOIN "User" u ON u.id = r.author_id
                WHERE r.movie_id = m.id AND (u.name > 'a' OR u.name < 'f')
            )
            ORDER BY m.id LIMIT 100"#,
        )
        .await?;
        to_result(&movies)
    })
}

fn find_many_movie_where_cast_person(pool: &PgPool) -> BoxFuture<'_, Result<BenchResult>> {
    Box::pin(async move {
        let movies = movies(
            pool,
            r#"WHERE EXISTS (
                SELECT 1 FROM "_ActorToMovie" am
                JOIN "Actor" a ON a.id = am."A"
                JOIN "Person" p ON p.id = a.person_id
                WHERE am."B" = m.id AND (p.last_name > 'a' OR p.last_name < 'f')
            )
            ORDER BY m.id LIMIT 100"#,
        )
        .await?;
        to_result(&movies)
    })
}

fn find_many_review_where_author(pool: &PgPool) -> BoxFuture<'_, Result<BenchResult>> {
    Box::pin(async move {
        let reviews = sqlx::query_as::<_, Review>(
            r#"SELECT r.id, r.body, r.rating, r.author_id, r.movie_id
               FROM "Review" r JOIN "User" u ON u.id = r.author_id
               WHERE u.name > 'a' OR u.name < 'f'
               ORDER BY r.id LIMIT 100"#,
        )
        .fetch_all(pool)
        .await?;
        to_result(&reviews)
    })
}

fn find_many_actor_where_movies_reviews_author(pool: &PgPool) -> BoxFuture<'_, Result<BenchResult>> {
    Box::pin(async move {
        let actors = sqlx::query_as::<_, Actor>(
            r#"SELECT a.id, a.name, a.person_id FROM "Actor" a
               WHERE EXISTS (
                   SELECT 1 FROM "_ActorToMovie" am
                   JOIN "Review" r ON r.movie_id = am."B"
                   JOIN "User" u ON u.id = r.author_id
                   WHERE am."A" = a.id AND (u.name > 'a' OR u.name < 'f')
               )
               ORDER BY a.id LIMIT 20"#,
        )
        .fetch_all(pool)
        .await?;
        to_result(&actors)
    })
}

fn find_unique_one2m_limit(pool: &PgPool) -> BoxFuture<'_, Result<BenchResult>> {
    Box::pin(async move {
        let Some(movie) = find_movie(pool, ONE2M_MOVIE_ID).await? else {
            return Ok(BenchResult::unique(None));
        };

        let reviews = sqlx::query_as::<_, Review>(REVIEWS_FOR_MOVIE_LIMIT)
            .bind(movie.id)
            .fetch_all(pool)
            .await?;

        Ok(BenchResult::unique(Some(with_relation(&movie, "reviews", &reviews)?)))
    })
}

fn find_unique_m2m_cast_limit(pool: &PgPool) -> BoxFuture<'_, Result<BenchResult>> {
    Box::pin(async move {
        let Some(movie) = find_movie(pool, M2M_MOVIE_ID).await? else {
            return Ok(BenchResult::unique(None));
        };

        let cast: Vec<Actor> = sqlx::query_as::<_, CastMember>(CAST_FOR_MOVIE_LIMIT)
            .bind(movie.id)
            .fetch_all(pool)
            .await?
            .into_iter()
            .map(|member| member.actor)
            .collect();

        Ok(BenchResult::unique(Some(with_relation(&movie, "cast", &cast)?)))
    })
}

async fn find_movie(pool: &PgPool, id: i32) -> Result<Option<Movie>> {
    let movie = sqlx::query_as::<_, Movie>(
        r#"SELECT id, title, description, year FROM "Movie" WHERE id = $1"#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(movie)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_details_is_not_implemented() {
        let table = benches();
        assert!(!table.contains(Scenario::ActorDetails));
        assert_eq!(table.len(), Scenario::ALL.len() - 1);
    }

    #[test]
    fn test_relation_is_added_to_parent() {
        let movie = Movie {
            id: 1,
            title: "cyan river".to_string(),
            description: "a film".to_string(),
            year: 1999,
        };
        let cast = vec![Actor {
            id: 9,
            name: "Ada Rossi".to_string(),
            person_id: 3,
        }];

        let value = with_relation(&movie, "cast", &cast).unwrap();
        assert_eq!(value["id"], 1);
        assert_eq!(value["cast"][0]["person_id"], 3);
    }

    #[test]
    fn test_missing_child_serializes_as_null() {
        let actor = Actor {
            id: 9,
            name: "Ada Rossi".to_string(),
            person_id: 3,
        };

        let value = with_relation_one::<_, Person>(&actor, "person", None).unwrap();
        assert!(value["person"].is_null());
    }
}
