use super::{
    alphabet::{is_canonical_address, MAX_ADDRESS_LEN, MIN_ADDRESS_LEN, MIN_FRAGMENT_LEN},
    markers::EndingSet,
    scanner::Fragment,
    Detection, DetectionKind,
};

/// Largest number of fragments joined into one candidate address.
pub const MAX_SPLIT_PARTS: usize = 3;

/// Which rule decided the concatenation order of a fragment combination.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderingDecision {
    /// Some members carry an ending marker: they go after the unmarked ones.
    EndingMarkerWins,
    /// No member (or every member) is marked: text order.
    PositionalOrder,
}

/// Arrange a fragment combination into concatenation order.
///
/// Unmarked members come first, then marked ones; each group keeps ascending
/// text position. When every member falls in the same group this reduces to
/// plain positional order, which is reported as such.
pub fn order_members<'a>(
    members: &[&'a Fragment],
    endings: &EndingSet,
) -> (OrderingDecision, Vec<&'a Fragment>) {
    let marked = members.iter().filter(|f| endings.contains(f)).count();
    let decision = if marked > 0 && marked < members.len() {
        OrderingDecision::EndingMarkerWins
    } else {
        OrderingDecision::PositionalOrder
    };

    let mut ordered = members.to_vec();
    ordered.sort_by_key(|f| (endings.contains(f), f.position));
    (decision, ordered)
}

/// Rebuild addresses that were split into 2 or 3 fragments.
///
/// Pairs are tried before triples. Each combination is ordered with
/// [`order_members`], concatenated, and kept only if it has the canonical
/// address shape and was not produced by an earlier combination.
///
/// Combinations are pruned on length before anything is allocated, so a
/// message packed with short fragments stays cheap.
pub fn reconstruct_split(fragments: &[Fragment], endings: &EndingSet) -> Vec<Detection> {
    let mut out: Vec<Detection> = Vec::new();

    // Anything longer leaves no room for a second fragment.
    let usable: Vec<&Fragment> = fragments
        .iter()
        .filter(|f| f.text.len() <= MAX_ADDRESS_LEN - MIN_FRAGMENT_LEN)
        .collect();
    let n = usable.len();
    if n < 2 {
        return out;
    }
    let lens: Vec<usize> = usable.iter().map(|f| f.text.len()).collect();
    let longest = lens.iter().copied().max().unwrap_or(0);

    for i in 0..n {
        for j in (i + 1)..n {
            if fits_address(lens[i] + lens[j]) {
                try_combination(&[usable[i], usable[j]], endings, &mut out);
            }
        }
    }

    for i in 0..n {
        for j in (i + 1)..n {
            let pair = lens[i] + lens[j];
            if pair + MIN_FRAGMENT_LEN > MAX_ADDRESS_LEN || pair + longest < MIN_ADDRESS_LEN {
                continue;
            }
            for k in (j + 1)..n {
                if fits_address(pair + lens[k]) {
                    try_combination(&[usable[i], usable[j], usable[k]], endings, &mut out);
                }
            }
        }
    }

    out
}

fn fits_address(len: usize) -> bool {
    (MIN_ADDRESS_LEN..=MAX_ADDRESS_LEN).contains(&len)
}

fn try_combination(members: &[&Fragment], endings: &EndingSet, out: &mut Vec<Detection>) {
    debug_assert!(members.len() <= MAX_SPLIT_PARTS);

    let (_, ordered) = order_members(members, endings);
    let address: String = ordered.iter().map(|f| f.text.as_str()).collect();
    if !is_canonical_address(&address) {
        return;
    }
    if out.iter().any(|d| d.address == address) {
        return;
    }

    let evidence = ordered
        .iter()
        .map(|f| f.text.as_str())
        .collect::<Vec<_>>()
        .join(" + ");
    out.push(Detection {
        address,
        evidence,
        kind: DetectionKind::Split,
    });
}
