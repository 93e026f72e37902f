//! Item synthesizer - renders catalog templates into question records
//!
//! Items are produced lazily, one per `next()`, with consecutive positions
//! starting at the requested start position. A stream never numbers past
//! `u32::MAX`; it ends early instead. Templates are taken in catalog
//! order and wrap around when more items are needed than templates exist.
//! The randomized variant (leftover fill) draws both kind and template at
//! random. Scored templates go through answer-bias correction.

use rand::Rng;

use crate::answers::{assign_correct_option, draw_target};
use crate::catalog::{Difficulty, ItemKind, Template, TemplateCatalog};
use crate::db::questions::{render_prompt, NewQuestion};
use crate::db::test_sets::Bucket;
use crate::error::CatalogError;

/// Synthesis settings
#[derive(Debug, Clone, Copy, Default)]
pub struct SynthOptions {
    /// Narrow aptitude templates to the bucket's difficulty profile
    pub match_difficulty: bool,
}

enum Selection<'a> {
    Cycle {
        kind: ItemKind,
        templates: Vec<&'a Template>,
        cursor: usize,
    },
    Random {
        pools: Vec<(ItemKind, Vec<&'a Template>)>,
    },
}

/// Finite, lazy stream of rendered questions
pub struct ItemStream<'a, R: Rng + ?Sized> {
    test_set_id: i64,
    selection: Selection<'a>,
    next_position: u32,
    remaining: u32,
    rng: &'a mut R,
}

fn pool<'a>(
    catalog: &'a TemplateCatalog,
    bucket: &Bucket,
    kind: ItemKind,
    options: SynthOptions,
) -> Result<Vec<&'a Template>, CatalogError> {
    if options.match_difficulty && kind.is_scored() {
        catalog.templates_at(kind, Difficulty::for_category_code(&bucket.category_code))
    } else {
        Ok(catalog.templates(kind)?.iter().collect())
    }
}

/// Items that fit between `start` and `u32::MAX` inclusive
fn room(start: u32, count: u32) -> u32 {
    count.min((u32::MAX - start).saturating_add(1))
}

/// Stream `count` items of one kind, cycling through the kind's templates.
///
/// Fails with `CatalogMiss` when the catalog has no templates for `kind`.
pub fn synthesize<'a, R: Rng + ?Sized>(
    catalog: &'a TemplateCatalog,
    bucket: &Bucket,
    kind: ItemKind,
    start_position: u32,
    count: u32,
    options: SynthOptions,
    rng: &'a mut R,
) -> Result<ItemStream<'a, R>, CatalogError> {
    let templates = pool(catalog, bucket, kind, options)?;
    Ok(ItemStream {
        test_set_id: bucket.id,
        selection: Selection::Cycle {
            kind,
            templates,
            cursor: 0,
        },
        next_position: start_position,
        remaining: room(start_position, count),
        rng,
    })
}

/// Stream `count` items drawing a uniformly random kind, then a random
/// template of that kind, for every item.
pub fn synthesize_leftover<'a, R: Rng + ?Sized>(
    catalog: &'a TemplateCatalog,
    bucket: &Bucket,
    start_position: u32,
    count: u32,
    options: SynthOptions,
    rng: &'a mut R,
) -> Result<ItemStream<'a, R>, CatalogError> {
    let pools = catalog
        .kinds()
        .map(|kind| pool(catalog, bucket, kind, options).map(|templates| (kind, templates)))
        .collect::<Result<Vec<_>, _>>()?;

    if pools.is_empty() {
        // Nothing to draw from at all; report the highest-priority kind
        return Err(CatalogError::CatalogMiss(ItemKind::ALL[0]));
    }

    Ok(ItemStream {
        test_set_id: bucket.id,
        selection: Selection::Random { pools },
        next_position: start_position,
        remaining: room(start_position, count),
        rng,
    })
}

impl<'a, R: Rng + ?Sized> ItemStream<'a, R> {
    fn pick(&mut self) -> (ItemKind, &'a Template) {
        match &mut self.selection {
            Selection::Cycle {
                kind,
                templates,
                cursor,
            } => {
                let template = templates[*cursor % templates.len()];
                *cursor += 1;
                (*kind, template)
            }
            Selection::Random { pools } => {
                let (kind, templates) = &pools[self.rng.gen_range(0..pools.len())];
                (*kind, templates[self.rng.gen_range(0..templates.len())])
            }
        }
    }
}

impl<'a, R: Rng + ?Sized> Iterator for ItemStream<'a, R> {
    type Item = NewQuestion;

    fn next(&mut self) -> Option<NewQuestion> {
        if self.remaining == 0 {
            return None;
        }

        let (kind, template) = self.pick();
        let rendered = if template.correct.is_some() {
            let target = draw_target(&mut *self.rng, template.options.len());
            assign_correct_option(template, target)
        } else {
            template.clone()
        };

        let position = self.next_position;
        self.next_position = position.saturating_add(1);
        self.remaining -= 1;

        Some(NewQuestion {
            test_set_id: self.test_set_id,
            kind,
            position,
            question_text: render_prompt(position, &rendered.prompt),
            options: rendered.options,
            correct_option: rendered.correct,
            difficulty: rendered.difficulty,
            skill: rendered.skill,
            points: kind.points(),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining as usize, Some(self.remaining as usize))
    }
}

impl<'a, R: Rng + ?Sized> ExactSizeIterator for ItemStream<'a, R> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answers::LetterDistribution;
    use crate::catalog::AnswerLetter;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn bucket(code: &str) -> Bucket {
        Bucket {
            id: 9,
            set_number: 1,
            category_code: code.to_string(),
            display_name: "Test".to_string(),
        }
    }

    fn small_catalog() -> TemplateCatalog {
        TemplateCatalog::builder()
            .templates(
                ItemKind::Personality,
                vec![
                    Template::unscored("P one", &["Yes", "No"], "a"),
                    Template::unscored("P two", &["Yes", "No"], "b"),
                    Template::unscored("P three", &["Yes", "No"], "c"),
                ],
            )
            .templates(
                ItemKind::Aptitude,
                vec![
                    Template::scored("Easy sum", &["1", "2", "3", "4"], AnswerLetter::A, "quantitative", Difficulty::Easy),
                    Template::scored("Hard sum", &["5", "6", "7", "8"], AnswerLetter::B, "quantitative", Difficulty::Hard),
                ],
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_positions_and_prompt_prefix() {
        let catalog = small_catalog();
        let mut rng = StdRng::seed_from_u64(1);
        let items: Vec<_> = synthesize(&catalog, &bucket("x"), ItemKind::Personality, 13, 4, SynthOptions::default(), &mut rng)
            .unwrap()
            .collect();

        assert_eq!(items.iter().map(|i| i.position).collect::<Vec<_>>(), vec![13, 14, 15, 16]);
        assert_eq!(items[0].question_text, "13. P one");
        assert_eq!(items[3].question_text, "16. P one");
        assert!(items.iter().all(|i| i.test_set_id == 9 && i.points == 1 && i.correct_option.is_none()));
    }

    #[test]
    fn test_cycles_evenly() {
        let catalog = small_catalog();
        let mut rng = StdRng::seed_from_u64(1);
        let items: Vec<_> = synthesize(&catalog, &bucket("x"), ItemKind::Personality, 1, 7, SynthOptions::default(), &mut rng)
            .unwrap()
            .collect();

        let skills: Vec<_> = items.iter().map(|i| i.skill.as_str()).collect();
        assert_eq!(skills, vec!["a", "b", "c", "a", "b", "c", "a"]);
    }

    #[test]
    fn test_zero_count_is_empty() {
        let catalog = small_catalog();
        let mut rng = StdRng::seed_from_u64(1);
        let stream = synthesize(&catalog, &bucket("x"), ItemKind::Aptitude, 1, 0, SynthOptions::default(), &mut rng).unwrap();
        assert_eq!(stream.len(), 0);
        assert_eq!(stream.count(), 0);
    }

    #[test]
    fn test_stops_at_last_position() {
        let catalog = small_catalog();
        let mut rng = StdRng::seed_from_u64(1);
        let items: Vec<_> = synthesize(&catalog, &bucket("x"), ItemKind::Personality, u32::MAX - 1, 5, SynthOptions::default(), &mut rng)
            .unwrap()
            .collect();

        assert_eq!(items.iter().map(|i| i.position).collect::<Vec<_>>(), vec![u32::MAX - 1, u32::MAX]);
        assert_eq!(items[1].question_text, "4294967295. P two");

        let stream = synthesize_leftover(&catalog, &bucket("x"), u32::MAX, 3, SynthOptions::default(), &mut rng).unwrap();
        assert_eq!(stream.len(), 1);
    }

    #[test]
    fn test_catalog_miss() {
        let catalog = small_catalog();
        let mut rng = StdRng::seed_from_u64(1);
        let err = synthesize(&catalog, &bucket("x"), ItemKind::Interest, 1, 3, SynthOptions::default(), &mut rng)
            .err()
            .unwrap();
        assert_eq!(err, CatalogError::CatalogMiss(ItemKind::Interest));
    }

    #[test]
    fn test_scored_items_keep_correct_text() {
        let catalog = small_catalog();
        let mut rng = StdRng::seed_from_u64(99);
        let items: Vec<_> = synthesize(&catalog, &bucket("x"), ItemKind::Aptitude, 1, 60, SynthOptions::default(), &mut rng)
            .unwrap()
            .collect();

        let mut dist = LetterDistribution::default();
        for item in &items {
            let letter = item.correct_option.expect("aptitude items are scored");
            let expected = if item.question_text.ends_with("Easy sum") { "1" } else { "6" };
            assert_eq!(item.options[letter.index()], expected);
            assert_eq!(item.points, 2);
            dist.record(letter);
        }
        assert!(dist.distinct_letters() >= 2);
    }

    #[test]
    fn test_match_difficulty_narrows_aptitude() {
        let catalog = small_catalog();
        let mut rng = StdRng::seed_from_u64(3);
        let options = SynthOptions { match_difficulty: true };
        let items: Vec<_> = synthesize(&catalog, &bucket("postgraduate"), ItemKind::Aptitude, 1, 4, options, &mut rng)
            .unwrap()
            .collect();

        assert!(items.iter().all(|i| i.question_text.ends_with("Hard sum")));
        assert!(items.iter().all(|i| i.difficulty == Difficulty::Hard));
    }

    #[test]
    fn test_leftover_is_seed_reproducible() {
        let catalog = small_catalog();
        let draw = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            synthesize_leftover(&catalog, &bucket("x"), 48, 3, SynthOptions::default(), &mut rng)
                .unwrap()
                .collect::<Vec<_>>()
        };

        let first = draw(5);
        assert_eq!(first, draw(5));
        assert_eq!(first.iter().map(|i| i.position).collect::<Vec<_>>(), vec![48, 49, 50]);
        assert!(first.iter().all(|i| matches!(i.kind, ItemKind::Aptitude | ItemKind::Personality)));
    }

    #[test]
    fn test_leftover_on_empty_catalog() {
        let catalog = TemplateCatalog::default();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(synthesize_leftover(&catalog, &bucket("x"), 1, 1, SynthOptions::default(), &mut rng).is_err());
    }
}
