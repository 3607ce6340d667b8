#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashMap};

use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};
use waffle_hub::ir::{
    Annotation, AnnotationId, BBoxXYXY, Category, CategoryId, Dataset, DatasetInfo, Image, ImageId,
    Pixel,
};

/// Superb AI stores box coordinates as plain JSON numbers.
pub const EPS_SUPERB_AI: f64 = 1e-9;

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(32);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// One annotation reduced to what survives a format round trip.
#[derive(Clone, Debug, PartialEq)]
pub struct AnnSem {
    pub image_file: String,
    pub supercategory: String,
    pub category: String,
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

/// Annotation semantics with image file names passed through `rename`.
pub fn ann_semantics_with(
    dataset: &Dataset,
    rename: impl Fn(&str) -> String,
) -> Result<Vec<AnnSem>, String> {
    let image_by_id: BTreeMap<ImageId, String> = dataset
        .images
        .iter()
        .map(|img| (img.id, rename(&img.file_name)))
        .collect();
    let category_by_id: BTreeMap<CategoryId, &Category> =
        dataset.categories.iter().map(|cat| (cat.id, cat)).collect();

    let mut out = Vec::with_capacity(dataset.annotations.len());
    for ann in &dataset.annotations {
        let image_file = image_by_id.get(&ann.image_id).ok_or_else(|| {
            format!(
                "annotation {} references missing image_id {}",
                ann.id.as_u64(),
                ann.image_id.as_u64()
            )
        })?;
        let category = category_by_id.get(&ann.category_id).ok_or_else(|| {
            format!(
                "annotation {} references missing category_id {}",
                ann.id.as_u64(),
                ann.category_id.as_u64()
            )
        })?;

        out.push(AnnSem {
            image_file: image_file.clone(),
            supercategory: category.supercategory.clone(),
            category: category.name.clone(),
            xmin: ann.bbox.xmin(),
            ymin: ann.bbox.ymin(),
            xmax: ann.bbox.xmax(),
            ymax: ann.bbox.ymax(),
        });
    }

    out.sort_by(ann_sem_cmp);
    Ok(out)
}

pub fn ann_semantics(dataset: &Dataset) -> Result<Vec<AnnSem>, String> {
    ann_semantics_with(dataset, str::to_string)
}

/// Compares annotations after mapping `b`'s file names through `rename_b`.
pub fn assert_annotations_equivalent(
    a: &Dataset,
    b: &Dataset,
    rename_b: impl Fn(&str) -> String,
    eps: f64,
) -> Result<(), String> {
    let left = ann_semantics(a)?;
    let right = ann_semantics_with(b, rename_b)?;

    if left.len() != right.len() {
        return Err(format!(
            "annotation count mismatch: left={} right={}",
            left.len(),
            right.len()
        ));
    }

    assert_semantics_subset(&left, &right, eps)?;
    assert_semantics_subset(&right, &left, eps)?;
    Ok(())
}

pub fn category_pairs(dataset: &Dataset) -> BTreeSet<(String, String)> {
    dataset
        .categories
        .iter()
        .map(|cat| (cat.supercategory.clone(), cat.name.clone()))
        .collect()
}

pub fn image_dims_by_file_name(
    dataset: &Dataset,
    rename: impl Fn(&str) -> String,
) -> BTreeMap<String, (u32, u32)> {
    dataset
        .images
        .iter()
        .map(|img| (rename(&img.file_name), (img.width, img.height)))
        .collect()
}

/// Datasets whose categories are spread over a few supercategories, so
/// both plain and typed Superb AI classes show up.
pub fn arb_dataset(max_images: usize, max_cats: usize, max_anns: usize) -> BoxedStrategy<Dataset> {
    assert!(max_images > 0, "max_images must be > 0");
    assert!(max_cats > 0, "max_cats must be > 0");

    (1usize..=max_images, 1usize..=max_cats, 0usize..=max_anns)
        .prop_flat_map(|(image_count, category_count, ann_count)| {
            (
                proptest::collection::hash_map(
                    image_file_name_strategy(),
                    (2u32..=2048, 2u32..=2048),
                    image_count..=image_count,
                ),
                proptest::collection::btree_set(
                    category_strategy(),
                    category_count..=category_count,
                ),
                proptest::collection::vec(ann_seed_strategy(), ann_count..=ann_count),
            )
                .prop_map(|(images, categories, ann_seeds)| {
                    build_dataset(images, categories, ann_seeds)
                })
        })
        .boxed()
}

type AnnSeed = (u16, u16, u32, u32, u32, u32);

fn ann_seed_strategy() -> impl Strategy<Value = AnnSeed> {
    (
        any::<u16>(),
        any::<u16>(),
        any::<u32>(),
        any::<u32>(),
        any::<u32>(),
        any::<u32>(),
    )
}

fn image_file_name_strategy() -> BoxedStrategy<String> {
    proptest::string::string_regex("([a-z]{1,4}/)?[a-z0-9_]{1,10}\\.jpg")
        .expect("valid filename regex")
        .boxed()
}

/// `(supercategory, name)`. A `None` supercategory makes the category its
/// own supercategory.
fn category_strategy() -> BoxedStrategy<(String, String)> {
    (
        proptest::option::of(prop_oneof![Just("vehicle"), Just("animal"), Just("sign")]),
        proptest::string::string_regex("[a-z]{1,12}").expect("valid category name regex"),
    )
        .prop_map(|(supercategory, name)| {
            let supercategory = supercategory.map_or_else(|| name.clone(), str::to_string);
            (supercategory, name)
        })
        .boxed()
}

fn build_dataset(
    image_data: HashMap<String, (u32, u32)>,
    category_rows: BTreeSet<(String, String)>,
    ann_seeds: Vec<AnnSeed>,
) -> Dataset {
    let mut image_rows: Vec<(String, (u32, u32))> = image_data.into_iter().collect();
    image_rows.sort_by(|a, b| a.0.cmp(&b.0));

    let images: Vec<Image> = image_rows
        .iter()
        .enumerate()
        .map(|(idx, (file_name, (width, height)))| {
            Image::new((idx + 1) as u64, file_name.clone(), *width, *height)
        })
        .collect();

    let categories: Vec<Category> = category_rows
        .into_iter()
        .enumerate()
        .map(|(idx, (supercategory, name))| {
            Category::with_supercategory((idx + 1) as u64, name, supercategory)
        })
        .collect();

    let annotations: Vec<Annotation> = ann_seeds
        .into_iter()
        .enumerate()
        .map(|(idx, (image_seed, category_seed, sx, sy, sw, sh))| {
            let image = &images[image_seed as usize % images.len()];
            let category = &categories[category_seed as usize % categories.len()];
            let bbox = bbox_from_seed(image.width, image.height, sx, sy, sw, sh);

            Annotation::new(
                AnnotationId::new((idx + 1) as u64),
                image.id,
                category.id,
                bbox,
            )
        })
        .collect();

    Dataset {
        info: DatasetInfo {
            name: "generated".to_string(),
            ..Default::default()
        },
        images,
        categories,
        annotations,
    }
}

fn bbox_from_seed(width: u32, height: u32, sx: u32, sy: u32, sw: u32, sh: u32) -> BBoxXYXY<Pixel> {
    let xmin = sx % (width - 1);
    let ymin = sy % (height - 1);
    let xmax = xmin + 1 + (sw % (width - xmin));
    let ymax = ymin + 1 + (sh % (height - ymin));

    BBoxXYXY::from_xyxy(xmin as f64, ymin as f64, xmax as f64, ymax as f64)
}

fn assert_semantics_subset(sub: &[AnnSem], sup: &[AnnSem], eps: f64) -> Result<(), String> {
    let mut used = vec![false; sup.len()];

    for wanted in sub {
        let found = sup
            .iter()
            .enumerate()
            .position(|(idx, candidate)| !used[idx] && approx_ann_sem(wanted, candidate, eps));

        match found {
            Some(idx) => used[idx] = true,
            None => {
                return Err(format!(
                    "missing annotation match for image='{}', category='{}/{}', bbox=({}, {}, {}, {}), eps={}",
                    wanted.image_file,
                    wanted.supercategory,
                    wanted.category,
                    wanted.xmin,
                    wanted.ymin,
                    wanted.xmax,
                    wanted.ymax,
                    eps
                ));
            }
        }
    }

    Ok(())
}

fn approx_ann_sem(left: &AnnSem, right: &AnnSem, eps: f64) -> bool {
    left.image_file == right.image_file
        && left.supercategory == right.supercategory
        && left.category == right.category
        && (left.xmin - right.xmin).abs() <= eps
        && (left.ymin - right.ymin).abs() <= eps
        && (left.xmax - right.xmax).abs() <= eps
        && (left.ymax - right.ymax).abs() <= eps
}

fn ann_sem_cmp(a: &AnnSem, b: &AnnSem) -> std::cmp::Ordering {
    a.image_file
        .cmp(&b.image_file)
        .then_with(|| a.supercategory.cmp(&b.supercategory))
        .then_with(|| a.category.cmp(&b.category))
        .then_with(|| a.xmin.total_cmp(&b.xmin))
        .then_with(|| a.ymin.total_cmp(&b.ymin))
        .then_with(|| a.xmax.total_cmp(&b.xmax))
        .then_with(|| a.ymax.total_cmp(&b.ymax))
}
