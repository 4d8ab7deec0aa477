use std::collections::BTreeMap;
use nalgebra::{DMatrix, DVector};
use tracing::trace;
use crate::error::{HybridError, Result};
use crate::Key;
use super::{JacobianFactor, GaussianConditional};

/// Absolute threshold on the diagonal of R below which a frontal column is considered
/// linearly dependent on the others.
pub const RANK_TOLERANCE : f64 = 1E-9;

/// Collects the dimension of every variable touched by the factors, failing when two
/// factors disagree about a variable.
pub fn variable_dims(factors : &[&JacobianFactor]) -> Result<BTreeMap<Key, usize>> {
    let mut dims = BTreeMap::new();
    for f in factors.iter() {
        for (k, d) in f.keys().iter().zip(f.dims().iter()) {
            match dims.get(k) {
                Some(prev) if prev != d => {
                    return Err(HybridError::Dimension { key : *k, expected : *prev, found : *d });
                },
                Some(_) => { },
                None => { dims.insert(*k, *d); }
            }
        }
    }
    Ok(dims)
}

/// Eliminates the frontal variables from the product of the factors: the whitened
/// blocks are stacked into [A | b] with columns ordered as frontals (in the informed order)
/// followed by the separator keys (ascending), and the system is triangularized by QR.
/// The first rows of the triangular factor give the conditional on the frontals, the
/// remaining ones a factor on the separator (which may have no keys, in which case
/// its b holds the residual left over by the least-squares solution).
pub fn eliminate(factors : &[&JacobianFactor], frontals : &[Key]) -> Result<(GaussianConditional, JacobianFactor)> {
    let dims = variable_dims(factors)?;
    for f in frontals.iter() {
        if !dims.contains_key(f) {
            return Err(HybridError::MissingKey(*f));
        }
    }
    let separator : Vec<Key> = dims.keys().filter(|k| !frontals.contains(k) ).cloned().collect();
    let columns : Vec<Key> = frontals.iter().chain(separator.iter()).cloned().collect();
    let mut offsets = BTreeMap::new();
    let mut n = 0;
    for k in columns.iter() {
        offsets.insert(*k, n);
        n += dims[k];
    }
    let nf : usize = frontals.iter().map(|k| dims[k] ).sum();
    let m : usize = factors.iter().map(|f| f.rows() ).sum();
    let first = frontals.first().cloned().unwrap_or(0);
    if m < nf {
        return Err(HybridError::IndeterminantSystem(first));
    }

    let mut ab = DMatrix::zeros(m, n + 1);
    let mut row = 0;
    for f in factors.iter() {
        let (a, b) = f.whitened();
        let mut col = 0;
        for (k, d) in f.keys().iter().zip(f.dims().iter()) {
            let off = offsets[k];
            ab.slice_mut((row, off), (f.rows(), *d)).copy_from(&a.columns(col, *d));
            col += d;
        }
        ab.slice_mut((row, n), (f.rows(), 1)).copy_from(&b);
        row += f.rows();
    }

    let mut r = ab.qr().r();
    for i in 0..nf {
        if r[(i, i)].abs() < RANK_TOLERANCE {
            let key = column_key(&columns, &dims, i).unwrap_or(first);
            trace!("Rank deficiency at column {} (variable {})", i, key);
            return Err(HybridError::IndeterminantSystem(key));
        }
        if r[(i, i)] < 0.0 {
            let mut row = r.row_mut(i);
            row.neg_mut();
        }
    }

    let frontal_pairs : Vec<(Key, usize)> = frontals.iter().map(|k| (*k, dims[k]) ).collect();
    let sep_pairs : Vec<(Key, usize)> = separator.iter().map(|k| (*k, dims[k]) ).collect();
    let cond = GaussianConditional::new(
        frontal_pairs,
        sep_pairs.clone(),
        r.slice((0, 0), (nf, nf)).clone_owned(),
        r.slice((0, nf), (nf, n - nf)).clone_owned(),
        r.slice((0, n), (nf, 1)).column(0).clone_owned()
    )?;

    let rem_rows = r.nrows() - nf;
    let mut terms = Vec::with_capacity(sep_pairs.len());
    let mut off = nf;
    for (k, d) in sep_pairs.iter() {
        terms.push((*k, r.slice((nf, off), (rem_rows, *d)).clone_owned()));
        off += d;
    }
    let b = DVector::from_fn(rem_rows, |i, _| r[(nf + i, n)] );
    let remainder = JacobianFactor::new(terms, b, None)?;
    Ok((cond, remainder))
}

fn column_key(columns : &[Key], dims : &BTreeMap<Key, usize>, col : usize) -> Option<Key> {
    let mut offset = 0;
    for k in columns.iter() {
        let d = *dims.get(k)?;
        if col < offset + d {
            return Some(*k);
        }
        offset += d;
    }
    None
}
