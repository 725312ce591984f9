//! Fold planning and construction.
//!
//! Items are cut into buckets of `ceil(n / k)` consecutive items, so every
//! bucket but the last has the same size. Fold `i` holds out bucket `i` and
//! trains on every other bucket, in bucket order. With row groups the items
//! are group ids and each group's rows stay on one side of the fold.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::boosting::Booster;
use crate::config::Parameters;
use crate::core::constants::CV_PACK_ID_ATTRIBUTE;
use crate::core::error::{Result, XGBoostError};
use crate::core::types::{RowIndex, UIntField};
use crate::dataset::DMatrix;

/// Row indices of one fold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldIndices {
    /// Training rows
    pub train: Vec<RowIndex>,
    /// Held out rows
    pub test: Vec<RowIndex>,
}

/// Row indices and group sizes of one group-preserving fold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupFoldIndices {
    /// Rows on each side
    pub rows: FoldIndices,
    /// Group sizes of the training rows, in row order
    pub train_groups: Vec<u32>,
    /// Group sizes of the held out rows, in row order
    pub test_groups: Vec<u32>,
}

/// Cut `items` into `k` buckets of `ceil(n / k)` items; the last bucket may
/// be smaller.
///
/// Fails when `k` is zero or when buckets of that size cannot fill `k`
/// folds, e.g. 10 items into 6 folds.
pub fn chunk<T: Clone>(items: &[T], k: usize) -> Result<Vec<Vec<T>>> {
    if k == 0 {
        return Err(XGBoostError::invalid_parameter("nfold", "0", "at least one fold is required"));
    }
    if items.is_empty() {
        return Err(XGBoostError::config("Cannot split an empty dataset into folds"));
    }

    let size = items.len().div_ceil(k);
    let chunks: Vec<Vec<T>> = items.chunks(size).map(<[T]>::to_vec).collect();
    if chunks.len() != k {
        return Err(XGBoostError::config(format!(
            "{} items in chunks of {} make {} folds, {} requested",
            items.len(),
            size,
            chunks.len(),
            k
        )));
    }
    Ok(chunks)
}

/// Bucket `i` as the held out side and the other buckets as training side.
fn split_chunks<T: Clone>(chunks: &[Vec<T>]) -> Vec<(Vec<T>, Vec<T>)> {
    (0..chunks.len())
        .map(|k| {
            let train = chunks
                .iter()
                .enumerate()
                .filter(|&(i, _)| i != k)
                .flat_map(|(_, chunk)| chunk.iter().cloned())
                .collect();
            (train, chunks[k].clone())
        })
        .collect()
}

fn row_index(row: usize) -> Result<RowIndex> {
    RowIndex::try_from(row)
        .map_err(|_| XGBoostError::config(format!("row {row} exceeds the C API row index range")))
}

/// Plan `k` plain folds over `rows` rows.
pub fn plan_folds<R: Rng + ?Sized>(rows: usize, k: usize, shuffle: bool, rng: &mut R) -> Result<Vec<FoldIndices>> {
    let mut indices = (0..rows).map(row_index).collect::<Result<Vec<_>>>()?;
    if shuffle {
        indices.shuffle(rng);
    }

    let chunks = chunk(&indices, k)?;
    Ok(split_chunks(&chunks)
        .into_iter()
        .map(|(train, test)| FoldIndices { train, test })
        .collect())
}

/// Rows of `groups`, in group order, given the group boundaries.
pub fn groups_to_rows(groups: &[usize], boundaries: &[u32]) -> Result<Vec<RowIndex>> {
    let mut rows = Vec::new();
    for &group in groups {
        let (start, end) = match (boundaries.get(group), boundaries.get(group + 1)) {
            (Some(&start), Some(&end)) => (start as usize, end as usize),
            _ => {
                return Err(XGBoostError::config(format!(
                    "group {group} is out of range for {} boundaries",
                    boundaries.len()
                )))
            }
        };
        for row in start..end {
            rows.push(row_index(row)?);
        }
    }
    Ok(rows)
}

/// Plan `k` folds that keep every group on one side.
///
/// `group_ptr` holds the group boundaries: group `g` covers rows
/// `group_ptr[g]..group_ptr[g + 1]`.
pub fn plan_group_folds<R: Rng + ?Sized>(
    group_ptr: &[u32],
    k: usize,
    shuffle: bool,
    rng: &mut R,
) -> Result<Vec<GroupFoldIndices>> {
    let sizes: Vec<u32> = group_ptr
        .windows(2)
        .map(|bounds| {
            bounds[1].checked_sub(bounds[0]).ok_or_else(|| {
                XGBoostError::config(format!("group boundaries {group_ptr:?} are not increasing"))
            })
        })
        .collect::<Result<_>>()?;

    let mut groups: Vec<usize> = (0..sizes.len()).collect();
    if shuffle {
        groups.shuffle(rng);
    }

    let chunks = chunk(&groups, k)?;
    split_chunks(&chunks)
        .into_iter()
        .map(|(train, test)| {
            Ok(GroupFoldIndices {
                rows: FoldIndices {
                    train: groups_to_rows(&train, group_ptr)?,
                    test: groups_to_rows(&test, group_ptr)?,
                },
                train_groups: train.iter().map(|&group| sizes[group]).collect(),
                test_groups: test.iter().map(|&group| sizes[group]).collect(),
            })
        })
        .collect()
}

/// One fold: its train and test matrices and the booster trained on them.
#[derive(Debug)]
pub struct CvFold {
    /// Fold identifier, also stored as the booster's `cvpack_id` attribute
    pub id: String,
    /// Training matrix
    pub train: DMatrix,
    /// Held out matrix
    pub test: DMatrix,
    /// Booster caching `train` and `test`
    pub booster: Booster,
}

impl CvFold {
    /// Create the fold's booster with `parameters`.
    pub fn new<S: Into<String>>(id: S, train: DMatrix, test: DMatrix, parameters: &Parameters) -> Result<Self> {
        let id = id.into();
        let mut booster = Booster::with_cache(&[&train, &test], parameters)?;
        booster.set_attribute(CV_PACK_ID_ATTRIBUTE, &id)?;
        Ok(CvFold {
            id,
            train,
            test,
            booster,
        })
    }
}

/// Split `data` into `k` folds, preserving row groups when `data` has more
/// than one.
///
/// Sides are named `<name>-train` and `<name>-test`.
pub fn make_folds<R: Rng + ?Sized>(
    data: &DMatrix,
    k: usize,
    parameters: &Parameters,
    shuffle: bool,
    rng: &mut R,
) -> Result<Vec<CvFold>> {
    let train_name = format!("{}-train", data.name());
    let test_name = format!("{}-test", data.name());
    let group_ptr = data.group_ptr()?;

    let folds = if group_ptr.len() > 1 {
        plan_group_folds(&group_ptr, k, shuffle, rng)?
            .into_iter()
            .enumerate()
            .map(|(index, plan)| {
                let train = data.slice(&plan.rows.train, Some(train_name.as_str()), true)?;
                train.set_uint(UIntField::Group, &plan.train_groups)?;
                let test = data.slice(&plan.rows.test, Some(test_name.as_str()), true)?;
                test.set_uint(UIntField::Group, &plan.test_groups)?;
                CvFold::new(index.to_string(), train, test, parameters)
            })
            .collect::<Result<Vec<_>>>()?
    } else {
        plan_folds(data.row_count()?, k, shuffle, rng)?
            .into_iter()
            .enumerate()
            .map(|(index, plan)| {
                let train = data.slice(&plan.train, Some(train_name.as_str()), false)?;
                let test = data.slice(&plan.test, Some(test_name.as_str()), false)?;
                CvFold::new(index.to_string(), train, test, parameters)
            })
            .collect::<Result<Vec<_>>>()?
    };

    log::debug!(
        "Split {:?} into {} folds{}",
        data.name(),
        folds.len(),
        if group_ptr.len() > 1 { " by group" } else { "" }
    );
    Ok(folds)
}
