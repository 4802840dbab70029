use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Unvisited,
    InProgress,
    Done,
}

/// Depth-first search over `edges` for a back edge.
///
/// Starts from `starts` in order, then from any node not yet reached, and
/// follows children in name order. Returns the cycle as a path that begins
/// and ends with the revisited node.
pub(crate) fn find_cycle<'a>(
    starts: impl IntoIterator<Item = &'a str>,
    edges: &'a BTreeMap<String, BTreeSet<String>>,
) -> Option<Vec<String>> {
    let mut state: HashMap<&str, VisitState> = edges
        .keys()
        .map(|name| (name.as_str(), VisitState::Unvisited))
        .collect();
    let all_nodes = edges.keys().map(String::as_str);

    for start in starts.into_iter().chain(all_nodes) {
        if state.get(start) != Some(&VisitState::Unvisited) {
            continue;
        }
        let Some(children) = edges.get(start) else {
            continue;
        };

        state.insert(start, VisitState::InProgress);
        let mut stack = vec![(start, children.iter())];

        loop {
            let next = match stack.last_mut() {
                Some((_, children)) => children.next(),
                None => break,
            };

            match next {
                Some(child) => match state.get(child.as_str()).copied() {
                    Some(VisitState::Unvisited) => {
                        if let Some(grandchildren) = edges.get(child) {
                            state.insert(child.as_str(), VisitState::InProgress);
                            stack.push((child.as_str(), grandchildren.iter()));
                        }
                    }
                    Some(VisitState::InProgress) => {
                        let begin = stack
                            .iter()
                            .position(|(name, _)| *name == child.as_str())
                            .unwrap_or(0);
                        let mut path: Vec<String> = stack[begin..]
                            .iter()
                            .map(|(name, _)| (*name).to_string())
                            .collect();
                        path.push(child.clone());
                        return Some(path);
                    }
                    Some(VisitState::Done) | None => {}
                },
                None => {
                    if let Some((finished, _)) = stack.pop() {
                        state.insert(finished, VisitState::Done);
                    }
                }
            }
        }
    }

    None
}
