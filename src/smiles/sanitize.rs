//! RDKit-style cleanup of a freshly read graph: plain explicit hydrogens are
//! folded into their neighbours, then aromaticity and valences are checked.

use yowl::{
    feature::{AtomKind, BondKind, Symbol, VirtualHydrogen},
    graph::{Atom, Bond},
    Element,
};

use super::{kekule, symbol, SmilesError};

fn is_hydrogen(kind: &AtomKind) -> bool {
    matches!(
        kind,
        AtomKind::Bracket {
            symbol: Symbol::Aliphatic(Element::H),
            ..
        }
    )
}

fn has_configuration(kind: &AtomKind) -> bool {
    matches!(
        kind,
        AtomKind::Bracket {
            configuration: Some(_),
            ..
        }
    )
}

/// whether atom `i` is a plain hydrogen that can be folded into its only
/// neighbour. isotopes, charged or mapped hydrogens, hydrogens on other
/// hydrogens, on directional bonds, or on stereocentres stay explicit
fn is_removable_h(atoms: &[Atom], i: usize) -> bool {
    let atom = &atoms[i];
    let AtomKind::Bracket {
        isotope: None,
        symbol: Symbol::Aliphatic(Element::H),
        configuration: None,
        hcount,
        charge,
        map: None,
    } = atom.kind
    else {
        return false;
    };
    if hcount.is_some_and(|h| !h.is_zero()) || charge.is_some_and(|c| i8::from(c) != 0) {
        return false;
    }
    let [bond] = atom.bonds.as_slice() else {
        return false;
    };
    let heavy = &atoms[bond.tid].kind;
    matches!(bond.kind, BondKind::Elided | BondKind::Single)
        && !is_hydrogen(heavy)
        && !has_configuration(heavy)
}

pub(super) fn remove_hydrogens(mut atoms: Vec<Atom>) -> Vec<Atom> {
    let n = atoms.len();
    let mut remove: Vec<bool> = (0..n).map(|i| is_removable_h(&atoms, i)).collect();
    if !remove.contains(&true) {
        return atoms;
    }

    let mut extra = vec![0u8; n];
    for i in (0..n).filter(|&i| remove[i]) {
        let heavy = atoms[i].bonds[0].tid;
        extra[heavy] = extra[heavy].saturating_add(1);
    }
    // bare atoms pick the hydrogens up again as implicit ones, bracket atoms
    // need them in their count
    for (i, atom) in atoms.iter_mut().enumerate() {
        if extra[i] == 0 {
            continue;
        }
        if let AtomKind::Bracket { hcount, .. } = &mut atom.kind {
            let total = hcount.as_ref().map_or(0, u8::from).saturating_add(extra[i]);
            match VirtualHydrogen::try_from(total) {
                Ok(h) => *hcount = Some(h),
                // more than a bracket can hold, so they stay explicit
                Err(()) => {
                    for bond in &atom.bonds {
                        remove[bond.tid] = false;
                    }
                }
            }
        }
    }

    let mut index = vec![None; n];
    let mut next = 0;
    for (i, &r) in remove.iter().enumerate() {
        if !r {
            index[i] = Some(next);
            next += 1;
        }
    }

    atoms
        .into_iter()
        .zip(remove)
        .filter(|(_, r)| !r)
        .map(|(mut atom, _)| {
            atom.bonds = atom
                .bonds
                .into_iter()
                .filter_map(|b| index[b.tid].map(|tid| Bond::new(b.kind, tid)))
                .collect();
            atom
        })
        .collect()
}

/// an aromatic bond, written as `:` or left out between two aromatic atoms
pub(super) fn is_aromatic_bond(atoms: &[Atom], i: usize, bond: &Bond) -> bool {
    match bond.kind {
        BondKind::Aromatic => true,
        BondKind::Elided => atoms[i].is_aromatic() && atoms[bond.tid].is_aromatic(),
        _ => false,
    }
}

fn explicit_valence(atom: &Atom) -> u32 {
    let hcount = match &atom.kind {
        AtomKind::Bracket { hcount: Some(h), .. } => u32::from(u8::from(h)),
        _ => 0,
    };
    atom.bonds.iter().map(|b| u32::from(b.order())).sum::<u32>() + hcount
}

/// aromatic atoms must sit in rings, explicit valences must not exceed the
/// largest default valence of the (isoelectronic) element, and every
/// aromatic system must have a Kekulé structure. Elements without default
/// valences, metals in particular, are not checked
pub(super) fn check(atoms: &[Atom]) -> Result<(), SmilesError> {
    for (i, atom) in atoms.iter().enumerate() {
        if atom.is_aromatic() {
            let ring_bonds = atom
                .bonds
                .iter()
                .filter(|b| is_aromatic_bond(atoms, i, b))
                .count();
            if ring_bonds < 2 {
                return Err(SmilesError::NonRingAromatic(i));
            }
        }
        let Some(&max) = atom.kind.targets().last() else {
            continue;
        };
        let valence = explicit_valence(atom);
        if valence > u32::from(max) {
            return Err(SmilesError::Valence {
                atom: i,
                symbol: symbol(&atom.kind),
                valence,
                max,
            });
        }
    }
    kekule::check(atoms)
}
