//! Chapter collections: filtering, duplicate resolution and grouping.
//!
//! Several groups often scanlate the same chapter. [`ChapterList::resolve_duplicates`] picks one
//! chapter per chapter number through a pipeline of tie breaks:
//!
//! 1. [`PreviousGroup`](DuplicateResolutionAlgorithm::PreviousGroup): prefer the groups that
//!    did the previously selected chapter.
//! 2. [`SpecificGroup`](DuplicateResolutionAlgorithm::SpecificGroup) and
//!    [`SpecificUser`](DuplicateResolutionAlgorithm::SpecificUser): prefer the given groups or uploaders.
//! 3. A last resort ordering, by default the chapter uploaded first.
//!
//! A stage only narrows the candidates when something matches, and resolution of a chapter
//! number stops as soon as a single candidate is left.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::cmp::{Ordering, Reverse};
use std::collections::{HashMap, HashSet};
use std::iter::Peekable;
use std::ops::{Deref, DerefMut};
use std::str::Chars;

use super::aggregate::MangaAggregate;
use super::chapter::Chapter;
use super::scanlation_group::ScanlationGroup;
use super::{Error, Result};
use crate::utils::{InclusionExclusionPair, Interval};
use crate::MangoClient;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DuplicateResolutionAlgorithm {
    PreviousGroup,
    SpecificGroup,
    SpecificUser,
    CreationDateAsc,
    CreationDateDesc,
    ViewsAsc,
    ViewsDesc,
}

impl DuplicateResolutionAlgorithm {
    pub const DEFAULT_STRATEGY: [Self; 2] = [Self::PreviousGroup, Self::CreationDateAsc];

    fn is_last_resort(self) -> bool {
        matches!(
            self,
            Self::CreationDateAsc | Self::CreationDateDesc | Self::ViewsAsc | Self::ViewsDesc
        )
    }
}

/// Checks the algorithm list and returns the last resort ordering to use
fn validate_strategy(
    algorithms: &[DuplicateResolutionAlgorithm],
) -> Result<DuplicateResolutionAlgorithm> {
    let last_resort: HashSet<_> = algorithms
        .iter()
        .copied()
        .filter(|algorithm| algorithm.is_last_resort())
        .collect();

    if last_resort.len() > 1 {
        return Err(Error::ConfigurationError(format!(
            "only one of the last resort duplicate resolution algorithms can be used, got {last_resort:?}"
        )));
    }

    match last_resort.into_iter().next() {
        Some(
            algorithm @ (DuplicateResolutionAlgorithm::ViewsAsc
            | DuplicateResolutionAlgorithm::ViewsDesc),
        ) => Err(Error::NotSupportedError(format!(
            "{algorithm:?}: chapter views"
        ))),
        Some(algorithm) => Ok(algorithm),
        None => Ok(DuplicateResolutionAlgorithm::CreationDateAsc),
    }
}

/// 1 if `candidate` contains all of `reference`, plus 1 for every member of `reference` it contains
fn overlap_score(candidate: &HashSet<&str>, reference: &HashSet<&str>) -> usize {
    let superset = usize::from(candidate.is_superset(reference));

    superset + reference.iter().filter(|item| candidate.contains(*item)).count()
}

fn group_set(chapter: &Chapter) -> HashSet<&str> {
    chapter.groups.iter().map(String::as_str).collect()
}

/// Options of [`ChapterList::filter`]. Unset options are skipped.
#[derive(Debug, Clone, Default, bon::Builder)]
pub struct ChapterFilter {
    pub locales: Option<Vec<String>>,
    /// Only chapters with a chapter number
    #[builder(default)]
    pub has_number: bool,
    pub creation_time: Option<Interval<DateTime<Utc>>>,
    pub update_time: Option<Interval<DateTime<Utc>>>,
    pub publish_time: Option<Interval<DateTime<Utc>>>,
    /// Not available from the API, setting it makes the filter fail
    pub views: Option<Interval<u64>>,
    /// Chapters without a number count as chapter 0
    pub chapter_number_range: Option<Interval<f64>>,
    pub chapter_numbers: Option<InclusionExclusionPair<f64>>,
    pub groups: Option<InclusionExclusionPair<String>>,
    pub users: Option<InclusionExclusionPair<String>>,
    #[builder(default)]
    pub remove_duplicates: bool,
    /// Defaults to [`DuplicateResolutionAlgorithm::DEFAULT_STRATEGY`]
    pub duplicate_strategy: Option<Vec<DuplicateResolutionAlgorithm>>,
    #[builder(default)]
    pub duplicate_strategy_groups: Vec<String>,
    #[builder(default)]
    pub duplicate_strategy_users: Vec<String>,
}

/// Chapters of one manga, in the order they were fetched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChapterList {
    pub manga: Option<String>,
    chapters: Vec<Chapter>,
}

impl Deref for ChapterList {
    type Target = Vec<Chapter>;

    fn deref(&self) -> &Self::Target {
        &self.chapters
    }
}

impl DerefMut for ChapterList {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.chapters
    }
}

impl IntoIterator for ChapterList {
    type Item = Chapter;
    type IntoIter = std::vec::IntoIter<Chapter>;

    fn into_iter(self) -> Self::IntoIter {
        self.chapters.into_iter()
    }
}

impl<'a> IntoIterator for &'a ChapterList {
    type Item = &'a Chapter;
    type IntoIter = std::slice::Iter<'a, Chapter>;

    fn into_iter(self) -> Self::IntoIter {
        self.chapters.iter()
    }
}

impl FromIterator<Chapter> for ChapterList {
    fn from_iter<I: IntoIterator<Item = Chapter>>(iter: I) -> Self {
        Self::new(None, iter.into_iter().collect())
    }
}

impl ChapterList {
    pub fn new(manga: Option<String>, chapters: Vec<Chapter>) -> Self {
        Self { manga, chapters }
    }

    fn with_chapters(&self, chapters: Vec<Chapter>) -> Self {
        Self::new(self.manga.clone(), chapters)
    }

    pub fn into_inner(self) -> Vec<Chapter> {
        self.chapters
    }

    /// Returns the chapters that pass every set option of `filter`, then removes
    /// duplicates if asked to
    #[tracing::instrument(skip_all, fields(chapters = self.len()))]
    pub fn filter(&self, filter: &ChapterFilter) -> Result<ChapterList> {
        if filter.views.is_some() {
            return Err(Error::NotSupportedError("filtering chapters by views".to_owned()));
        }

        let strategy = filter
            .duplicate_strategy
            .clone()
            .unwrap_or_else(|| DuplicateResolutionAlgorithm::DEFAULT_STRATEGY.to_vec());
        if filter.remove_duplicates {
            validate_strategy(&strategy)?;
        }

        let kept: Vec<Chapter> = self
            .iter()
            .filter(|chapter| {
                filter
                    .locales
                    .as_ref()
                    .map_or(true, |locales| locales.contains(&chapter.language))
            })
            .filter(|chapter| !filter.has_number || chapter.number.is_some())
            .filter(|chapter| {
                filter
                    .creation_time
                    .as_ref()
                    .map_or(true, |interval| interval.contains(&chapter.created_at))
            })
            .filter(|chapter| {
                filter
                    .update_time
                    .as_ref()
                    .map_or(true, |interval| interval.contains(&chapter.modified_at()))
            })
            .filter(|chapter| {
                filter
                    .publish_time
                    .as_ref()
                    .map_or(true, |interval| interval.contains(&chapter.published_at()))
            })
            .filter(|chapter| {
                filter.chapter_number_range.as_ref().map_or(true, |interval| {
                    interval.contains(&chapter.numeric_number().unwrap_or_default())
                })
            })
            .filter(|chapter| {
                filter
                    .chapter_numbers
                    .as_ref()
                    .map_or(true, |pair| pair.matches(&chapter.numeric_number().unwrap_or_default()))
            })
            .filter(|chapter| {
                filter
                    .groups
                    .as_ref()
                    .map_or(true, |pair| pair.matches_any(chapter.groups.iter()))
            })
            .filter(|chapter| {
                filter.users.as_ref().map_or(true, |pair| match &chapter.uploader {
                    Some(uploader) => pair.matches(uploader),
                    None => pair.include.is_empty(),
                })
            })
            .cloned()
            .collect();

        tracing::debug!(kept = kept.len(), "chapters filtered");

        let kept = self.with_chapters(kept);
        if !filter.remove_duplicates {
            return Ok(kept);
        }

        kept.resolve_duplicates(
            &strategy,
            &filter.duplicate_strategy_groups,
            &filter.duplicate_strategy_users,
        )
    }

    /// Keeps one chapter per chapter number. Chapters without a number are all kept and come
    /// first, the rest follow in order of first appearance of their number.
    #[tracing::instrument(skip_all, fields(chapters = self.len(), algorithms = ?algorithms))]
    pub fn resolve_duplicates(
        &self,
        algorithms: &[DuplicateResolutionAlgorithm],
        specific_groups: &[String],
        specific_users: &[String],
    ) -> Result<ChapterList> {
        let last_resort = validate_strategy(algorithms)?;
        let requested = |algorithm| algorithms.contains(&algorithm);

        let mut unnumbered = Vec::new();
        let mut numbers: Vec<&str> = Vec::new();
        let mut by_number: HashMap<&str, Vec<&Chapter>> = HashMap::new();

        for chapter in self.iter() {
            match chapter.number.as_deref() {
                None => unnumbered.push(chapter.clone()),
                Some(number) => {
                    let candidates = by_number.entry(number).or_insert_with(|| {
                        numbers.push(number);
                        Vec::new()
                    });
                    candidates.push(chapter);
                }
            }
        }

        let specific_groups: HashSet<&str> = specific_groups.iter().map(String::as_str).collect();
        let mut previous_groups: Option<HashSet<&str>> = None;
        let mut resolved = unnumbered;

        for number in numbers {
            let Some(mut candidates) = by_number.remove(number) else {
                continue;
            };

            if candidates.len() > 1 && requested(DuplicateResolutionAlgorithm::PreviousGroup) {
                if let Some(previous) = &previous_groups {
                    let mut tiers: HashMap<usize, Vec<&Chapter>> = HashMap::new();
                    for &candidate in &candidates {
                        let score = overlap_score(&group_set(candidate), previous);
                        if score > 0 {
                            tiers.entry(score).or_default().push(candidate);
                        }
                    }

                    if let Some(lowest) = tiers.keys().min().copied() {
                        candidates = tiers.remove(&lowest).unwrap_or_default();
                    }
                }
            }

            if candidates.len() > 1 && requested(DuplicateResolutionAlgorithm::SpecificGroup) {
                let matching: Vec<&Chapter> = candidates
                    .iter()
                    .copied()
                    .filter(|candidate| overlap_score(&group_set(candidate), &specific_groups) > 0)
                    .collect();

                if !matching.is_empty() {
                    candidates = matching;
                }
            }

            if candidates.len() > 1 && requested(DuplicateResolutionAlgorithm::SpecificUser) {
                let matching: Vec<&Chapter> = candidates
                    .iter()
                    .copied()
                    .filter(|candidate| {
                        candidate
                            .uploader
                            .as_ref()
                            .is_some_and(|uploader| specific_users.contains(uploader))
                    })
                    .collect();

                if !matching.is_empty() {
                    candidates = matching;
                }
            }

            let selected = match last_resort {
                DuplicateResolutionAlgorithm::CreationDateDesc => candidates
                    .iter()
                    .copied()
                    .min_by_key(|candidate| Reverse(candidate.created_at)),
                _ => candidates
                    .iter()
                    .copied()
                    .min_by_key(|candidate| candidate.created_at),
            };

            let Some(selected) = selected else {
                continue;
            };

            previous_groups = Some(group_set(selected));
            resolved.push(selected.clone());
        }

        tracing::debug!(kept = resolved.len(), "duplicates resolved");

        Ok(self.with_chapters(resolved))
    }

    pub fn group_by_volumes(&self) -> HashMap<Option<String>, Vec<Chapter>> {
        let mut groups: HashMap<Option<String>, Vec<Chapter>> = HashMap::new();
        for chapter in self.iter() {
            groups
                .entry(chapter.volume.clone())
                .or_default()
                .push(chapter.clone());
        }

        groups
    }

    pub fn group_by_numbers(&self) -> HashMap<Option<String>, Vec<Chapter>> {
        let mut groups: HashMap<Option<String>, Vec<Chapter>> = HashMap::new();
        for chapter in self.iter() {
            groups
                .entry(chapter.number.clone())
                .or_default()
                .push(chapter.clone());
        }

        groups
    }

    pub fn group_by_volume_and_chapters(
        &self,
    ) -> HashMap<(Option<String>, Option<String>), Vec<Chapter>> {
        let mut groups: HashMap<(Option<String>, Option<String>), Vec<Chapter>> = HashMap::new();
        for chapter in self.iter() {
            groups
                .entry((chapter.volume.clone(), chapter.number.clone()))
                .or_default()
                .push(chapter.clone());
        }

        groups
    }

    /// Volume and chapter counts of the chapters in the list
    pub fn calculate_aggregate(&self) -> MangaAggregate {
        let mut aggregate = MangaAggregate::default();
        for chapter in self.iter() {
            aggregate.add(chapter.volume.clone(), chapter.number.clone());
        }

        aggregate
    }

    /// Languages present in the list, sorted
    pub fn locales(&self) -> Vec<String> {
        let mut locales: Vec<String> = self
            .iter()
            .map(|chapter| chapter.language.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        locales.sort();

        locales
    }

    /// Natural order of the chapter names, so `Chapter 2` comes before `Chapter 10`
    pub fn sort(&mut self, reverse: bool) {
        self.chapters.sort_by(|a, b| {
            let order = natural_cmp(&a.name(), &b.name());
            if reverse {
                order.reverse()
            } else {
                order
            }
        });
    }

    /// Fetches the groups of every chapter that are not cached yet and returns all of them
    pub async fn load_groups(&self, client: &MangoClient) -> Result<Vec<ScanlationGroup>> {
        let mut ids: Vec<String> = Vec::new();
        for id in self.iter().flat_map(|chapter| chapter.groups.iter()) {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }

        let missing = client.registry.missing::<ScanlationGroup>(&ids);
        if !missing.is_empty() {
            client.batch_groups(&missing).await?;
        }

        Ok(ids
            .iter()
            .filter_map(|id| client.registry.get::<ScanlationGroup>(id))
            .collect())
    }
}

fn take_number(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
        digits.push(c);
        chars.next();
    }

    digits.trim_start_matches('0').to_owned()
}

/// Compares strings chunk by chunk, runs of digits by their numeric value
fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a = a.chars().peekable();
    let mut b = b.chars().peekable();

    loop {
        match (a.peek().copied(), b.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let x = take_number(&mut a);
                let y = take_number(&mut b);
                let order = x.len().cmp(&y.len()).then_with(|| x.cmp(&y));
                if order != Ordering::Equal {
                    return order;
                }
            }
            (Some(x), Some(y)) => {
                if x != y {
                    return x.cmp(&y);
                }
                a.next();
                b.next();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;
    use super::DuplicateResolutionAlgorithm::*;

    fn chapter(id: &str, number: Option<&str>, groups: &[&str], day: u32) -> Chapter {
        Chapter {
            id: id.to_owned(),
            version: 1,
            volume: None,
            number: number.map(str::to_owned),
            title: Some(format!("title {id}")),
            language: "en".to_owned(),
            pages: 10,
            external_url: None,
            created_at: Utc.with_ymd_and_hms(2021, 5, day, 0, 0, 0).unwrap(),
            updated_at: None,
            publish_at: None,
            manga: Some("m1".to_owned()),
            groups: groups.iter().map(|group| group.to_string()).collect(),
            uploader: Some(format!("uploader-{id}")),
        }
    }

    fn ids(list: &ChapterList) -> Vec<&str> {
        list.iter().map(|chapter| chapter.id.as_str()).collect()
    }

    fn sample() -> ChapterList {
        ChapterList::new(
            Some("m1".to_owned()),
            vec![
                chapter("a", Some("1"), &["A"], 3),
                chapter("b", Some("1"), &["B"], 1),
                chapter("c", None, &["C"], 2),
                chapter("d", Some("2"), &["A"], 4),
            ],
        )
    }

    #[test]
    fn empty_filter_keeps_everything() {
        let list = sample();

        let filtered = list.filter(&ChapterFilter::default()).unwrap();

        assert_eq!(filtered, list);
    }

    #[test]
    fn filters_apply_in_sequence() {
        let mut list = sample();
        list[3].language = "fr".to_owned();

        let filter = ChapterFilter::builder()
            .locales(vec!["en".to_owned()])
            .has_number(true)
            .groups(InclusionExclusionPair::exclude(vec!["B".to_owned()]))
            .build();

        assert_eq!(ids(&list.filter(&filter).unwrap()), vec!["a"]);
    }

    #[test]
    fn number_filters_treat_unnumbered_as_zero() {
        let list = sample();

        let filter = ChapterFilter::builder()
            .chapter_number_range(Interval::below(1.5))
            .build();
        assert_eq!(ids(&list.filter(&filter).unwrap()), vec!["a", "b", "c"]);

        let filter = ChapterFilter::builder()
            .chapter_numbers(InclusionExclusionPair::include(vec![0.0, 2.0]))
            .build();
        assert_eq!(ids(&list.filter(&filter).unwrap()), vec!["c", "d"]);
    }

    #[test]
    fn creation_interval_is_half_open() {
        let list = sample();

        let filter = ChapterFilter::builder()
            .creation_time(Interval::new(
                Utc.with_ymd_and_hms(2021, 5, 2, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2021, 5, 4, 0, 0, 0).unwrap(),
            ))
            .build();

        assert_eq!(ids(&list.filter(&filter).unwrap()), vec!["a", "c"]);
    }

    #[test]
    fn users_filter() {
        let list = sample();

        let filter = ChapterFilter::builder()
            .users(InclusionExclusionPair::include(vec!["uploader-d".to_owned()]))
            .build();

        assert_eq!(ids(&list.filter(&filter).unwrap()), vec!["d"]);
    }

    #[test]
    fn views_are_not_supported() {
        let filter = ChapterFilter::builder().views(Interval::at_least(100)).build();

        assert!(matches!(
            sample().filter(&filter),
            Err(Error::NotSupportedError(_))
        ));
        assert!(matches!(
            sample().resolve_duplicates(&[ViewsDesc], &[], &[]),
            Err(Error::NotSupportedError(_))
        ));
    }

    #[test]
    fn conflicting_last_resort_algorithms() {
        let result = sample().resolve_duplicates(&[CreationDateAsc, CreationDateDesc], &[], &[]);
        assert!(matches!(result, Err(Error::ConfigurationError(_))));

        let result = sample().resolve_duplicates(&[CreationDateAsc, ViewsAsc], &[], &[]);
        assert!(matches!(result, Err(Error::ConfigurationError(_))));

        let filter = ChapterFilter::builder()
            .remove_duplicates(true)
            .duplicate_strategy(vec![CreationDateDesc, CreationDateAsc])
            .build();
        assert!(matches!(
            sample().filter(&filter),
            Err(Error::ConfigurationError(_))
        ));
    }

    #[test]
    fn unnumbered_chapters_are_always_kept() {
        let list = ChapterList::new(
            None,
            vec![
                chapter("a", Some("1"), &["A"], 3),
                chapter("x", None, &["A"], 1),
                chapter("b", Some("1"), &["B"], 1),
                chapter("y", None, &["B"], 2),
            ],
        );

        for strategy in [vec![], vec![PreviousGroup, SpecificGroup, CreationDateDesc]] {
            let resolved = list.resolve_duplicates(&strategy, &[], &[]).unwrap();

            assert_eq!(resolved.len(), 3);
            assert_eq!(&ids(&resolved)[..2], ["x", "y"]);
        }
    }

    #[test]
    fn creation_date_tie_break() {
        let list = sample();

        let asc = list.resolve_duplicates(&[], &[], &[]).unwrap();
        assert_eq!(ids(&asc), vec!["c", "b", "d"]);

        let desc = list.resolve_duplicates(&[CreationDateDesc], &[], &[]).unwrap();
        assert_eq!(ids(&desc), vec!["c", "a", "d"]);
    }

    #[test]
    fn previous_group_prefers_overlap() {
        let list = ChapterList::new(
            None,
            vec![
                chapter("4", Some("4"), &["A", "B"], 1),
                // created first, wins without the previous group rule
                chapter("5-other", Some("5"), &["C"], 2),
                chapter("5-a", Some("5"), &["A"], 3),
            ],
        );

        let resolved = list
            .resolve_duplicates(&DuplicateResolutionAlgorithm::DEFAULT_STRATEGY, &[], &[])
            .unwrap();
        assert_eq!(ids(&resolved), vec!["4", "5-a"]);

        let resolved = list.resolve_duplicates(&[CreationDateAsc], &[], &[]).unwrap();
        assert_eq!(ids(&resolved), vec!["4", "5-other"]);
    }

    #[test]
    fn previous_group_keeps_lowest_positive_tier() {
        let list = ChapterList::new(
            None,
            vec![
                chapter("1", Some("1"), &["A", "B"], 1),
                // superset of the previous groups: score 3
                chapter("2-full", Some("2"), &["A", "B"], 2),
                // partial overlap: score 1
                chapter("2-partial", Some("2"), &["B"], 3),
            ],
        );

        let resolved = list.resolve_duplicates(&[PreviousGroup], &[], &[]).unwrap();

        assert_eq!(ids(&resolved), vec!["1", "2-partial"]);
    }

    #[test]
    fn previous_group_follows_the_selected_chapter() {
        let list = ChapterList::new(
            None,
            vec![
                chapter("1", Some("1"), &["A"], 1),
                chapter("2-b", Some("2"), &["B"], 2),
                chapter("2-a", Some("2"), &["A"], 5),
                chapter("3-a", Some("3"), &["A"], 3),
                chapter("3-b", Some("3"), &["B"], 6),
            ],
        );

        let resolved = list.resolve_duplicates(&[PreviousGroup], &[], &[]).unwrap();

        assert_eq!(ids(&resolved), vec!["1", "2-a", "3-a"]);
    }

    #[test]
    fn specific_group_and_user() {
        let list = ChapterList::new(
            None,
            vec![
                chapter("1-a", Some("1"), &["A"], 1),
                chapter("1-b", Some("1"), &["B"], 2),
                chapter("1-b2", Some("1"), &["B"], 3),
            ],
        );

        let resolved = list
            .resolve_duplicates(&[SpecificGroup], &["B".to_owned()], &[])
            .unwrap();
        assert_eq!(ids(&resolved), vec!["1-b"]);

        let resolved = list
            .resolve_duplicates(
                &[SpecificGroup, SpecificUser],
                &["B".to_owned()],
                &["uploader-1-b2".to_owned()],
            )
            .unwrap();
        assert_eq!(ids(&resolved), vec!["1-b2"]);

        // nothing matches, narrowing is skipped
        let resolved = list
            .resolve_duplicates(&[SpecificGroup], &["Z".to_owned()], &[])
            .unwrap();
        assert_eq!(ids(&resolved), vec!["1-a"]);
    }

    #[test]
    fn duplicate_removal_through_filter_uses_default_strategy() {
        let filter = ChapterFilter::builder().remove_duplicates(true).build();

        assert_eq!(ids(&sample().filter(&filter).unwrap()), vec!["c", "b", "d"]);
    }

    #[test]
    fn aggregate_and_grouping() {
        let mut list = sample();
        list[0].volume = Some("1".to_owned());
        list[1].volume = Some("1".to_owned());

        let aggregate = list.calculate_aggregate();
        assert_eq!(aggregate.volume(Some("1")).unwrap().count(Some("1")), 2);
        assert_eq!(aggregate.volume(None).unwrap().count(None), 1);
        assert_eq!(aggregate.total(), 4);

        assert_eq!(list.group_by_numbers()[&Some("1".to_owned())].len(), 2);
        assert_eq!(list.group_by_volumes()[&None].len(), 2);
        assert_eq!(
            list.group_by_volume_and_chapters()[&(Some("1".to_owned()), Some("1".to_owned()))].len(),
            2
        );
        assert_eq!(list.locales(), vec!["en"]);
    }

    #[test]
    fn natural_sort() {
        let mut list = ChapterList::new(
            None,
            vec![
                chapter("10", Some("10"), &[], 1),
                chapter("2", Some("2"), &[], 1),
                chapter("1", Some("1"), &[], 1),
            ],
        );

        list.sort(false);
        assert_eq!(ids(&list), vec!["1", "2", "10"]);

        list.sort(true);
        assert_eq!(ids(&list), vec!["10", "2", "1"]);

        assert_eq!(natural_cmp("a01", "a1"), Ordering::Equal);
        assert_eq!(natural_cmp("Chapter 9", "Chapter 10"), Ordering::Less);
    }
}
