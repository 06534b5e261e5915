//! Scenario registry
//!
//! The fixed set of benchmark scenarios shared by every runner. Declaration
//! order is the order in which groups are registered and displayed.

use std::fmt;
use std::str::FromStr;

use crate::errors::BenchError;

/// A named query or mutation pattern benchmarked identically across backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scenario {
    // trivial
    FindManyAll,
    FindManyAllLimit,
    FindManyAllLimitFilter,
    FindManyFiftyMostRecentMovieTitleAsc,
    UpdateOneMovie,
    // complex
    FindManyM2mCastLimit,
    FindManyM2mCastLimitFilter,
    FindManyM2mCastAndToOnePersonLimitFilter,
    FindManyMovieWhereReviewsAuthor,
    FindManyMovieWhereCastPerson,
    FindManyReviewWhereAuthor,
    FindManyActorWhereMoviesReviewsAuthor,
    FindUniqueOne2mLimit,
    FindUniqueM2mCastLimit,
    ActorDetails,
}

impl Scenario {
    /// Every scenario, in registry order
    pub const ALL: [Scenario; 15] = [
        Scenario::FindManyAll,
        Scenario::FindManyAllLimit,
        Scenario::FindManyAllLimitFilter,
        Scenario::FindManyFiftyMostRecentMovieTitleAsc,
        Scenario::UpdateOneMovie,
        Scenario::FindManyM2mCastLimit,
        Scenario::FindManyM2mCastLimitFilter,
        Scenario::FindManyM2mCastAndToOnePersonLimitFilter,
        Scenario::FindManyMovieWhereReviewsAuthor,
        Scenario::FindManyMovieWhereCastPerson,
        Scenario::FindManyReviewWhereAuthor,
        Scenario::FindManyActorWhereMoviesReviewsAuthor,
        Scenario::FindUniqueOne2mLimit,
        Scenario::FindUniqueM2mCastLimit,
        Scenario::ActorDetails,
    ];

    /// Stable identifier used on the command line and as the group name
    pub fn id(self) -> &'static str {
        match self {
            Scenario::FindManyAll => "FIND_MANY_ALL",
            Scenario::FindManyAllLimit => "FIND_MANY_ALL_LIMIT",
            Scenario::FindManyAllLimitFilter => "FIND_MANY_ALL_LIMIT_FILTER",
            Scenario::FindManyFiftyMostRecentMovieTitleAsc => {
                "FIND_MANY_FIFTY_MOST_RECENT_MOVIE_TITLE_ASC"
            }
            Scenario::UpdateOneMovie => "UPDATE_ONE_MOVIE",
            Scenario::FindManyM2mCastLimit => "FIND_MANY_M2M_CAST_LIMIT",
            Scenario::FindManyM2mCastLimitFilter => "FIND_MANY_M2M_CAST_LIMIT_FILTER",
            Scenario::FindManyM2mCastAndToOnePersonLimitFilter => {
                "FIND_MANY_M2M_CAST_AND_TO_ONE_PERSON_LIMIT_FILTER"
            }
            Scenario::FindManyMovieWhereReviewsAuthor => "FIND_MANY_MOVIE_WHERE_REVIEWS_AUTHOR",
            Scenario::FindManyMovieWhereCastPerson => "FIND_MANY_MOVIE_WHERE_CAST_PERSON",
            Scenario::FindManyReviewWhereAuthor => "FIND_MANY_REVIEW_WHERE_AUTHOR",
            Scenario::FindManyActorWhereMoviesReviewsAuthor => {
                "FIND_MANY_ACTOR_WHERE_MOVIES_REVIEWS_AUTHOR"
            }
            Scenario::FindUniqueOne2mLimit => "FIND_UNIQUE_ONE2M_LIMIT",
            Scenario::FindUniqueM2mCastLimit => "FIND_UNIQUE_M2M_CAST_LIMIT",
            Scenario::ActorDetails => "ACTOR_DETAILS",
        }
    }

    /// Human-readable description of the query shape
    pub fn description(self) -> &'static str {
        match self {
            Scenario::FindManyAll => "movies.findMany() (all - 25000)",
            Scenario::FindManyAllLimit => "movies.findMany({ take: 2000 })",
            Scenario::FindManyAllLimitFilter => "movies.findMany({ where: {...}, take: 2000 })",
            Scenario::FindManyFiftyMostRecentMovieTitleAsc => {
                "movies.findMany(orderBy: [{ year: \"desc\" }, { title: \"asc\" }], take: 50)"
            }
            Scenario::UpdateOneMovie => "movie.update(...)",
            Scenario::FindManyM2mCastLimit => {
                "movies.findMany({ include: { cast: true } take: 2000 }) (m2m)"
            }
            Scenario::FindManyM2mCastLimitFilter => {
                "movies.findMany({ where: {...}, include: { cast: true } take: 2000 }) (m2m)"
            }
            Scenario::FindManyM2mCastAndToOnePersonLimitFilter => {
                "movie.findMany({ where: { ... }, take: 2000, include: { cast: { include: { person: true } } } })"
            }
            Scenario::FindManyMovieWhereReviewsAuthor => {
                "movie.findMany({ where: { reviews: { author: { ... } }, take: 100 }) (to-many -> to-one)"
            }
            Scenario::FindManyMovieWhereCastPerson => {
                "movie.findMany({ where: { cast: { person: { ... } }, take: 100 }) (m2m -> to-one)"
            }
            Scenario::FindManyReviewWhereAuthor => {
                "review.findMany({ where: { author: { ... } }, take: 100 }) (to-one)"
            }
            Scenario::FindManyActorWhereMoviesReviewsAuthor => {
                "actor.findMany({ where: { movies: { some: { reviews: { some: { author: { ... } } } } } }, take: 20 } (to-many -> to-many -> to-one)"
            }
            Scenario::FindUniqueOne2mLimit => {
                "movie.findUnique({ where: { ... }, include: { reviews: { take: 3, } } })"
            }
            Scenario::FindUniqueM2mCastLimit => {
                "movie.findUnique({ where: { ... }, include: { cast: { take: 3, } } })"
            }
            Scenario::ActorDetails => {
                "Actor with 25 most recent movies order by title ASC, including 15 actors of each movies"
            }
        }
    }

    /// Resolve the scenarios to benchmark.
    ///
    /// Without a filter this is the whole registry. With a filter, only the
    /// named scenarios are kept, still in registry order.
    pub fn resolve(filter: Option<&[Scenario]>) -> Vec<Scenario> {
        match filter {
            None => Scenario::ALL.to_vec(),
            Some(ids) => Scenario::ALL
                .iter()
                .copied()
                .filter(|s| ids.contains(s))
                .collect(),
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Scenario {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scenario::ALL
            .iter()
            .copied()
            .find(|scenario| scenario.id() == s)
            .ok_or_else(|| BenchError::UnknownScenario(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_are_unique() {
        let ids: HashSet<&str> = Scenario::ALL.iter().map(|s| s.id()).collect();
        assert_eq!(ids.len(), Scenario::ALL.len());
    }

    #[test]
    fn test_parse_by_id() {
        assert_eq!(
            Scenario::from_str("FIND_MANY_ALL_LIMIT").unwrap(),
            Scenario::FindManyAllLimit
        );
        assert_eq!(Scenario::from_str("ACTOR_DETAILS").unwrap(), Scenario::ActorDetails);
        assert!(matches!(
            Scenario::from_str("find_many_all"),
            Err(BenchError::UnknownScenario(_))
        ));
    }

    #[test]
    fn test_resolve_without_filter_is_full_registry() {
        assert_eq!(Scenario::resolve(None), Scenario::ALL.to_vec());
    }

    #[test]
    fn test_resolve_keeps_registry_order() {
        let filter = [Scenario::ActorDetails, Scenario::FindManyAll];
        assert_eq!(
            Scenario::resolve(Some(&filter)),
            vec![Scenario::FindManyAll, Scenario::ActorDetails]
        );
    }
}
