//! Kekulé structures for aromatic systems.
//!
//! An aromatic atom whose valence still has room after counting its bonds
//! and hydrogens has to take part in exactly one double bond, placed on one
//! of its aromatic bonds. The system is valid when those atoms can be paired
//! up along aromatic bonds, i.e. when the subgraph they span has a perfect
//! matching. `c1ccccc1` pairs up, `c1cccc1` and `c1ccnc1` do not, and in
//! `c1cc[nH]c1` the nitrogen has no room left and stays out of the matching.

use yowl::graph::Atom;

use super::{sanitize::is_aromatic_bond, SmilesError};

struct Matching {
    /// aromatic neighbours that also need a double bond
    partners: Vec<Vec<usize>>,
    mate: Vec<Option<usize>>,
}

impl Matching {
    fn free_partners(&self, i: usize) -> usize {
        self.partners[i]
            .iter()
            .filter(|&&j| self.mate[j].is_none())
            .count()
    }

    /// pair up every atom in `members`, always extending from the atom with
    /// the fewest free partners and backtracking on dead ends
    fn solve(&mut self, members: &[usize]) -> bool {
        let mut best: Option<(usize, usize)> = None;
        for &i in members {
            if self.mate[i].is_some() {
                continue;
            }
            let free = self.free_partners(i);
            if free == 0 {
                return false;
            }
            if best.map_or(true, |(_, f)| free < f) {
                best = Some((i, free));
            }
        }
        let Some((i, _)) = best else {
            return true;
        };
        for k in 0..self.partners[i].len() {
            let j = self.partners[i][k];
            if self.mate[j].is_some() {
                continue;
            }
            self.mate[i] = Some(j);
            self.mate[j] = Some(i);
            if self.solve(members) {
                return true;
            }
            self.mate[i] = None;
            self.mate[j] = None;
        }
        false
    }
}

/// every connected aromatic system has a Kekulé structure
pub(super) fn check(atoms: &[Atom]) -> Result<(), SmilesError> {
    let needs: Vec<bool> = atoms
        .iter()
        .map(|a| a.is_aromatic() && a.subvalence() > 0)
        .collect();
    let partners = atoms
        .iter()
        .enumerate()
        .map(|(i, atom)| {
            if !needs[i] {
                return Vec::new();
            }
            atom.bonds
                .iter()
                .filter(|b| needs[b.tid] && is_aromatic_bond(atoms, i, b))
                .map(|b| b.tid)
                .collect()
        })
        .collect();
    let mut matching = Matching {
        partners,
        mate: vec![None; atoms.len()],
    };

    // systems are solved one at a time so that a failure in one never
    // retries the choices made in another
    let mut seen = vec![false; atoms.len()];
    for start in 0..atoms.len() {
        if !needs[start] || seen[start] {
            continue;
        }
        let mut members = vec![start];
        seen[start] = true;
        let mut k = 0;
        while k < members.len() {
            for &j in &matching.partners[members[k]] {
                if !seen[j] {
                    seen[j] = true;
                    members.push(j);
                }
            }
            k += 1;
        }
        if !matching.solve(&members) {
            return Err(SmilesError::Kekulize(start));
        }
    }
    Ok(())
}
