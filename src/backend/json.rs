//! JSON aggregation scenarios
//!
//! Every scenario is a single statement: PostgreSQL builds the nested
//! result itself with `to_jsonb`, `jsonb_build_object` and `jsonb_agg`, and
//! the driver only decodes one JSON value per row.

use futures::future::BoxFuture;
use serde_json::Value;
use sqlx::PgPool;

use crate::backend::models::MoviePatch;
use crate::errors::Result;
use crate::runner::{BenchResult, BenchTable};
use crate::scenario::Scenario;
use crate::seed::Faker;

const FIND_MANY_ALL: &str = r#"SELECT to_jsonb(m) FROM "Movie" m"#;

const FIND_MANY_ALL_LIMIT: &str = r#"SELECT to_jsonb(m) FROM "Movie" m ORDER BY m.id LIMIT 2000"#;

const FIND_MANY_ALL_LIMIT_FILTER: &str = r#"
SELECT to_jsonb(m) FROM "Movie" m
WHERE m.title LIKE '%cyan%'
ORDER BY m.id LIMIT 2000"#;

const FIND_MANY_FIFTY_MOST_RECENT: &str = r#"
SELECT to_jsonb(m) FROM "Movie" m
ORDER BY m.year DESC, m.title ASC LIMIT 50"#;

const UPDATE_ONE_MOVIE: &str = r#"
UPDATE "Movie" AS m SET year = $2, title = $3, description = $4
WHERE m.id = $1
RETURNING to_jsonb(m)"#;

const FIND_MANY_M2M_CAST_LIMIT: &str = r#"
SELECT to_jsonb(m) || jsonb_build_object('cast', COALESCE((
    SELECT jsonb_agg(to_jsonb(a) ORDER BY a.id)
    FROM "_ActorToMovie" am JOIN "Actor" a ON a.id = am."A"
    WHERE am."B" = m.id
), '[]'::jsonb))
FROM (SELECT * FROM "Movie" ORDER BY id LIMIT 2000) m
ORDER BY m.id"#;

const FIND_MANY_M2M_CAST_LIMIT_FILTER: &str = r#"
SELECT to_jsonb(m) || jsonb_build_object('cast', COALESCE((
    SELECT jsonb_agg(to_jsonb(a) ORDER BY a.id)
    FROM "_ActorToMovie" am JOIN "Actor" a ON a.id = am."A"
    WHERE am."B" = m.id
), '[]'::jsonb))
FROM (SELECT * FROM "Movie" WHERE title LIKE '%cyan%' ORDER BY id LIMIT 2000) m
ORDER BY m.id"#;

const FIND_MANY_M2M_CAST_AND_PERSON_LIMIT_FILTER: &str = r#"
SELECT to_jsonb(m) || jsonb_build_object('cast', COALESCE((
    SELECT jsonb_agg(to_jsonb(a) || jsonb_build_object('person', to_jsonb(p)) ORDER BY a.id)
    FROM "_ActorToMovie" am
    JOIN "Actor" a ON a.id = am."A"
    LEFT JOIN "Person" p ON p.id = a.person_id
    WHERE am."B" = m.id
), '[]'::jsonb))
FROM (SELECT * FROM "Movie" WHERE title LIKE '%cyan%' ORDER BY id LIMIT 2000) m
ORDER BY m.id"#;

const FIND_MANY_MOVIE_WHERE_REVIEWS_AUTHOR: &str = r#"
SELECT to_jsonb(m) FROM "Movie" m
WHERE EXISTS (
    SELECT 1 FROM "Review" r JOIN "User" u ON u.id = r.author_id
    WHERE r.movie_id = m.id AND (u.name > 'a' OR u.name < 'f')
)
ORDER BY m.id LIMIT 100"#;

const FIND_MANY_MOVIE_WHERE_CAST_PERSON: &str = r#"
SELECT to_jsonb(m) FROM "Movie" m
WHERE EXISTS (
    SELECT 1 FROM "_ActorToMovie" am
    JOIN "Actor" a ON a.id = am."A"
    JOIN "Person" p ON p.id = a.person_id
    WHERE am."B" = m.id AND (p.last_name > 'a' OR p.last_name < 'f')
)
ORDER BY m.id LIMIT 100"#;

const FIND_MANY_REVIEW_WHERE_AUTHOR: &str = r#"
SELECT to_jsonb(r) FROM "Review" r
JOIN "User" u ON u.id = r.author_id
WHERE u.name > 'a' OR u.name < 'f'
ORDER BY r.id LIMIT 100"#;

const FIND_MANY_ACTOR_WHERE_MOVIES_REVIEWS_AUTHOR: &str = r#"
SELECT to_jsonb(a) FROM "Actor" a
WHERE EXISTS (
    SELECT 1 FROM "_ActorToMovie" am
    JOIN "Review" r ON r.movie_id = am."B"
    JOIN "User" u ON u.id = r.author_id
    WHERE am."A" = a.id AND (u.name > 'a' OR u.name < 'f')
)
ORDER BY a.id LIMIT 20"#;

const FIND_UNIQUE_ONE2M_LIMIT: &str = r#"
SELECT to_jsonb(m) || jsonb_build_object('reviews', COALESCE((
    SELECT jsonb_agg(to_jsonb(r) ORDER BY r.id)
    FROM (SELECT * FROM "Review" WHERE movie_id = m.id ORDER BY id LIMIT 3) r
), '[]'::jsonb))
FROM "Movie" m WHERE m.id = $1"#;

const FIND_UNIQUE_M2M_CAST_LIMIT: &str = r#"
SELECT to_jsonb(m) || jsonb_build_object('cast', COALESCE((
    SELECT jsonb_agg(to_jsonb(a) ORDER BY a.id)
    FROM (
        SELECT ca.* FROM "_ActorToMovie" am JOIN "Actor" ca ON ca.id = am."A"
        WHERE am."B" = m.id ORDER BY ca.id LIMIT 3
    ) a
), '[]'::jsonb))
FROM "Movie" m WHERE m.id = $1"#;

const ACTOR_DETAILS: &str = r#"
SELECT to_jsonb(a) || jsonb_build_object(
    'person', (SELECT to_jsonb(p) FROM "Person" p WHERE p.id = a.person_id),
    'movies', COALESCE((
        SELECT jsonb_agg(to_jsonb(m) || jsonb_build_object('cast', COALESCE((
            SELECT jsonb_agg(
                to_jsonb(c) || jsonb_build_object(
                    'person', (SELECT to_jsonb(cp) FROM "Person" cp WHERE cp.id = c.person_id)
                ) ORDER BY c.name)
            FROM (
                SELECT ca.* FROM "_ActorToMovie" cam JOIN "Actor" ca ON ca.id = cam."A"
                WHERE cam."B" = m.id ORDER BY ca.name LIMIT 15
            ) c
        ), '[]'::jsonb)) ORDER BY m.year DESC)
        FROM (
            SELECT mv.* FROM "_ActorToMovie" am JOIN "Movie" mv ON mv.id = am."B"
            WHERE am."A" = a.id ORDER BY mv.year DESC LIMIT 25
        ) m
    ), '[]'::jsonb)
)
FROM "Actor" a WHERE a.id = $1"#;

/// Movie loaded with its first reviews
pub const ONE2M_MOVIE_ID: i32 = 1273;
/// Movie loaded with its first cast members
pub const M2M_MOVIE_ID: i32 = 22651;
/// Actor with many movies
pub const DETAILED_ACTOR_ID: i32 = 1513;

/// Every scenario, implemented as one JSON-producing statement
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
        .with(Scenario::ActorDetails, actor_details)
}

async fn fetch_many(pool: &PgPool, sql: &'static str) -> Result<BenchResult> {
    let rows = sqlx::query_scalar::<_, Value>(sql).fetch_all(pool).await?;
    Ok(BenchResult::new(rows))
}

async fn fetch_unique(pool: &PgPool, sql: &'static str, id: i32) -> Result<BenchResult> {
    let row = sqlx::query_scalar::<_, Value>(sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(BenchResult::unique(row))
}

fn find_many_all(pool: &PgPool) -> BoxFuture<'_, Result<BenchResult>> {
    Box::pin(fetch_many(pool, FIND_MANY_ALL))
}

fn find_many_all_limit(pool: &PgPool) -> BoxFuture<'_, Result<BenchResult>> {
    Box::pin(fetch_many(pool, FIND_MANY_ALL_LIMIT))
}

fn find_many_all_limit_filter(pool: &PgPool) -> BoxFuture<'_, Result<BenchResult>> {
    Box::pin(fetch_many(pool, FIND_MANY_ALL_LIMIT_FILTER))
}

fn find_many_fifty_most_recent(pool: &PgPool) -> BoxFuture<'_, Result<BenchResult>> {
    Box::pin(fetch_many(pool, FIND_MANY_FIFTY_MOST_RECENT))
}

fn update_one_movie(pool: &PgPool) -> BoxFuture<'_, Result<BenchResult>> {
    Box::pin(async move {
        let patch = MoviePatch::random(&mut Faker::from_entropy());
        let row = sqlx::query_scalar::<_, Value>(UPDATE_ONE_MOVIE)
            .bind(MoviePatch::TARGET_ID)
            .bind(patch.year)
            .bind(patch.title)
            .bind(patch.description)
            .fetch_optional(pool)
            .await?;
        Ok(BenchResult::unique(row))
    })
}

fn find_many_m2m_cast_limit(pool: &PgPool) -> BoxFuture<'_, Result<BenchResult>> {
    Box::pin(fetch_many(pool, FIND_MANY_M2M_CAST_LIMIT))
}

fn find_many_m2m_cast_limit_filter(pool: &PgPool) -> BoxFuture<'_, Result<BenchResult>> {
    Box::pin(fetch_many(pool, FIND_MANY_M2M_CAST_LIMIT_FILTER))
}

fn find_many_m2m_cast_and_person_limit_filter(pool: &PgPool) -> BoxFuture<'_, Result<BenchResult>> {
    Box::pin(fetch_many(pool, FIND_MANY_M2M_CAST_AND_PERSON_LIMIT_FILTER))
}

fn find_many_movie_where_reviews_author(pool: &PgPool) -> BoxFuture<'_, Result<BenchResult>> {
    Box::pin(fetch_many(pool, FIND_MANY_MOVIE_WHERE_REVIEWS_AUTHOR))
}

fn find_many_movie_where_cast_person(pool: &PgPool) -> BoxFuture<'_, Result<BenchResult>> {
    Box::pin(fetch_many(pool, FIND_MANY_MOVIE_WHERE_CAST_PERSON))
}

fn find_many_review_where_author(pool: &PgPool) -> BoxFuture<'_, Result<BenchResult>> {
    Box::pin(fetch_many(pool, FIND_MANY_REVIEW_WHERE_AUTHOR))
}

fn find_many_actor_where_movies_reviews_author(pool: &PgPool) -> BoxFuture<'_, Result<BenchResult>> {
    Box::pin(fetch_many(pool, FIND_MANY_ACTOR_WHERE_MOVIES_REVIEWS_AUTHOR))
}

fn find_unique_one2m_limit(pool: &PgPool) -> BoxFuture<'_, Result<BenchResult>> {
    Box::pin(fetch_unique(pool, FIND_UNIQUE_ONE2M_LIMIT, ONE2M_MOVIE_ID))
}

fn find_unique_m2m_cast_limit(pool: &PgPool) -> BoxFuture<'_, Result<BenchResult>> {
    Box::pin(fetch_unique(pool, FIND_UNIQUE_M2M_CAST_LIMIT, M2M_MOVIE_ID))
}

fn actor_details(pool: &PgPool) -> BoxFuture<'_, Result<BenchResult>> {
    Box::pin(fetch_unique(pool, ACTOR_DETAILS, DETAILED_ACTOR_ID))
}
