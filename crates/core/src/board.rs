#![forbid(unsafe_code)]

//! Kanban view over one project's issues.
//!
//! [`Board`] holds a snapshot read from storage and answers the questions a
//! board view asks: which cards sit in which column, what a drop means, and
//! what the header counters show. It never performs I/O; callers persist the
//! [`DropPlan`] it produces and feed the result back through [`Board::apply`].

use crate::ids::{IssueId, StateId};
use crate::model::{Issue, IssueState, StateGroup, UserSummary};
use crate::ordering;
use serde::Serialize;
use std::collections::HashMap;
use time::Date;

/// An issue as the board renders it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BoardIssue {
    #[serde(flatten)]
    pub issue: Issue,
    pub assignee: Option<UserSummary>,
    /// Plain text of the description, used by the search filter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description_text: Option<String>,
}

impl BoardIssue {
    /// Case-insensitive substring match on the name or the description text.
    /// A blank search matches everything.
    pub fn matches_search(&self, search: &str) -> bool {
        matches_search(self, normalize_search(search).as_deref())
    }
}

/// Everything the board needs, read at one change-feed version.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BoardSnapshot {
    pub version: i64,
    pub states: Vec<IssueState>,
    pub issues: Vec<BoardIssue>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropTarget {
    /// The column itself (header or empty area).
    State(StateId),
    /// Another card; the dragged card lands next to it.
    Issue(IssueId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoopReason {
    NoTarget,
    UnknownIssue,
    UnknownTarget,
    SameState,
    SamePosition,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DropPlan {
    Noop {
        reason: NoopReason,
    },
    Move {
        issue_id: IssueId,
        from_state: Option<StateId>,
        to_state: StateId,
        /// `None` keeps the current sort order.
        sort_order: Option<f64>,
    },
    /// The fractional gap ran out; the whole target column is rewritten.
    Renumber {
        issue_id: IssueId,
        to_state: StateId,
        orders: Vec<(IssueId, f64)>,
    },
}

#[derive(Clone, Debug, Serialize)]
pub struct Column<'a> {
    pub state: &'a IssueState,
    pub issues: Vec<&'a BoardIssue>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BoardStats {
    pub total: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub overdue: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Board {
    version: i64,
    states: Vec<IssueState>,
    issues: Vec<BoardIssue>,
}

impl Board {
    pub fn from_snapshot(snapshot: BoardSnapshot) -> Self {
        let mut board = Self {
            version: snapshot.version,
            states: snapshot.states,
            issues: snapshot.issues,
        };
        board
            .states
            .sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.name.cmp(&b.name)));
        board.sort_issues();
        board
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn states(&self) -> &[IssueState] {
        &self.states
    }

    pub fn issues(&self) -> &[BoardIssue] {
        &self.issues
    }

    pub fn issue(&self, id: IssueId) -> Option<&BoardIssue> {
        self.issues.iter().find(|item| item.issue.id == id)
    }

    pub fn state(&self, id: StateId) -> Option<&IssueState> {
        self.states.iter().find(|state| state.id == id)
    }

    /// One column per state in position order; `search` filters cards by a
    /// case-insensitive substring of the name or description.
    pub fn columns(&self, search: &str) -> Vec<Column<'_>> {
        let needle = normalize_search(search);
        self.states
            .iter()
            .map(|state| Column {
                state,
                issues: self
                    .issues
                    .iter()
                    .filter(|item| item.issue.state_id == Some(state.id))
                    .filter(|item| matches_search(item, needle.as_deref()))
                    .collect(),
            })
            .collect()
    }

    /// Issues whose state was removed. They belong to no column.
    pub fn unassigned(&self, search: &str) -> Vec<&BoardIssue> {
        let needle = normalize_search(search);
        self.issues
            .iter()
            .filter(|item| item.issue.state_id.is_none_or(|id| self.state(id).is_none()))
            .filter(|item| matches_search(item, needle.as_deref()))
            .collect()
    }

    pub fn plan_drop(&self, active: IssueId, target: Option<DropTarget>) -> DropPlan {
        let Some(target) = target else {
            return noop(NoopReason::NoTarget);
        };
        let Some(dragged) = self.issue(active) else {
            return noop(NoopReason::UnknownIssue);
        };
        let from_state = dragged.issue.state_id;

        match target {
            DropTarget::State(to_state) => {
                if self.state(to_state).is_none() {
                    return noop(NoopReason::UnknownTarget);
                }
                if from_state == Some(to_state) {
                    return noop(NoopReason::SameState);
                }
                DropPlan::Move {
                    issue_id: active,
                    from_state,
                    to_state,
                    sort_order: None,
                }
            }
            DropTarget::Issue(over) => {
                if over == active {
                    return noop(NoopReason::SamePosition);
                }
                let Some(to_state) = self
                    .issue(over)
                    .and_then(|item| item.issue.state_id)
                    .filter(|id| self.state(*id).is_some())
                else {
                    return noop(NoopReason::UnknownTarget);
                };
                self.plan_card_drop(active, from_state, over, to_state)
            }
        }
    }

    fn plan_card_drop(
        &self,
        active: IssueId,
        from_state: Option<StateId>,
        over: IssueId,
        to_state: StateId,
    ) -> DropPlan {
        let column = self.column_ids(to_state);
        let moving_down = from_state == Some(to_state)
            && position_of(&column, active) < position_of(&column, over);

        let mut rest = column
            .into_iter()
            .filter(|(id, _)| *id != active)
            .collect::<Vec<_>>();
        let over_index = position_of(&rest, over).unwrap_or(rest.len());
        let insert_at = if moving_down {
            over_index + 1
        } else {
            over_index
        };

        let lower = insert_at
            .checked_sub(1)
            .and_then(|i| rest.get(i))
            .map(|(_, order)| *order);
        let upper = rest.get(insert_at).map(|(_, order)| *order);

        match ordering::between(lower, upper) {
            Some(sort_order) => DropPlan::Move {
                issue_id: active,
                from_state,
                to_state,
                sort_order: Some(sort_order),
            },
            None => {
                rest.insert(insert_at, (active, 0.0));
                let fresh = ordering::renumbered(rest.len());
                let orders = rest
                    .into_iter()
                    .zip(fresh)
                    .map(|((id, _), order)| (id, order))
                    .collect();
                DropPlan::Renumber {
                    issue_id: active,
                    to_state,
                    orders,
                }
            }
        }
    }

    /// Optimistic in-memory application of a plan.
    pub fn apply(&mut self, plan: &DropPlan) {
        match plan {
            DropPlan::Noop { .. } => return,
            DropPlan::Move {
                issue_id,
                to_state,
                sort_order,
                ..
            } => {
                if let Some(item) = self.issues.iter_mut().find(|i| i.issue.id == *issue_id) {
                    item.issue.state_id = Some(*to_state);
                    if let Some(order) = sort_order {
                        item.issue.sort_order = *order;
                    }
                }
            }
            DropPlan::Renumber {
                issue_id,
                to_state,
                orders,
            } => {
                let orders = orders.iter().copied().collect::<HashMap<_, _>>();
                for item in &mut self.issues {
                    if item.issue.id == *issue_id {
                        item.issue.state_id = Some(*to_state);
                    }
                    if let Some(order) = orders.get(&item.issue.id) {
                        item.issue.sort_order = *order;
                    }
                }
            }
        }
        self.sort_issues();
    }

    pub fn stats(&self, today: Date) -> BoardStats {
        let groups = self
            .states
            .iter()
            .map(|state| (state.id, state.group))
            .collect::<HashMap<_, _>>();
        let mut stats = BoardStats {
            total: self.issues.len(),
            ..BoardStats::default()
        };
        for item in &self.issues {
            let group = item.issue.state_id.and_then(|id| groups.get(&id).copied());
            match group {
                Some(StateGroup::Started) => stats.in_progress += 1,
                Some(StateGroup::Completed) => stats.completed += 1,
                _ => {}
            }
            let closed = group.is_some_and(StateGroup::is_closed);
            if !closed
                && item
                    .issue
                    .target_date
                    .is_some_and(|target| target.date() < today)
            {
                stats.overdue += 1;
            }
        }
        stats
    }

    fn column_ids(&self, state: StateId) -> Vec<(IssueId, f64)> {
        self.issues
            .iter()
            .filter(|item| item.issue.state_id == Some(state))
            .map(|item| (item.issue.id, item.issue.sort_order))
            .collect()
    }

    fn sort_issues(&mut self) {
        self.issues.sort_by(|a, b| {
            a.issue
                .sort_order
                .total_cmp(&b.issue.sort_order)
                .then_with(|| a.issue.sequence_id.cmp(&b.issue.sequence_id))
        });
    }
}

fn noop(reason: NoopReason) -> DropPlan {
    DropPlan::Noop { reason }
}

fn position_of(column: &[(IssueId, f64)], id: IssueId) -> Option<usize> {
    column.iter().position(|(candidate, _)| *candidate == id)
}

fn normalize_search(search: &str) -> Option<String> {
    let trimmed = search.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_lowercase())
}

fn matches_search(item: &BoardIssue, needle: Option<&str>) -> bool {
    let Some(needle) = needle else {
        return true;
    };
    item.issue.name.to_lowercase().contains(needle)
        || item
            .description_text
            .as_deref()
            .is_some_and(|text| text.to_lowercase().contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ProjectId;
    use crate::model::{IssueDate, Priority};
    use time::macros::date;

    struct Fixture {
        project: ProjectId,
        states: Vec<IssueState>,
        issues: Vec<BoardIssue>,
    }

    impl Fixture {
        fn new() -> Self {
            let project = ProjectId::generate();
            let states = [
                ("Backlog", StateGroup::Backlog),
                ("Todo", StateGroup::Unstarted),
                ("In Progress", StateGroup::Started),
                ("Done", StateGroup::Completed),
            ]
            .into_iter()
            .enumerate()
            .map(|(position, (name, group))| IssueState {
                id: StateId::generate(),
                project_id: project,
                name: name.to_string(),
                color: "#3f3f46".to_string(),
                position: position as i64,
                group,
                created_at_ms: 0,
            })
            .collect();
            Self {
                project,
                states,
                issues: Vec::new(),
            }
        }

        fn state(&self, index: usize) -> StateId {
            self.states[index].id
        }

        fn issue(&mut self, name: &str, state: usize, sort_order: f64) -> IssueId {
            let id = IssueId::generate();
            let sequence_id = self.issues.len() as i64 + 1;
            self.issues.push(BoardIssue {
                issue: Issue {
                    id,
                    project_id: self.project,
                    state_id: Some(self.state(state)),
                    sequence_id,
                    name: name.to_string(),
                    priority: Priority::Medium,
                    estimate: None,
                    start_date: None,
                    target_date: None,
                    completed_at_ms: None,
                    assignee_id: None,
                    created_by: None,
                    sort_order,
                    is_draft: false,
                    archived_at_ms: None,
                    created_at_ms: 0,
                    updated_at_ms: 0,
                },
                assignee: None,
                description_text: None,
            });
            id
        }

        fn board(&self) -> Board {
            Board::from_snapshot(BoardSnapshot {
                version: 7,
                states: self.states.clone(),
                issues: self.issues.clone(),
            })
        }
    }

    fn names<'a>(column: &Column<'a>) -> Vec<&'a str> {
        column
            .issues
            .iter()
            .map(|item| item.issue.name.as_str())
            .collect()
    }

    #[test]
    fn columns_follow_state_position_and_sort_order() {
        let mut fx = Fixture::new();
        fx.issue("second", 0, 131070.0);
        fx.issue("first", 0, 65535.0);
        fx.issue("doing", 2, 65535.0);
        fx.states.reverse();
        let board = fx.board();

        let columns = board.columns("");
        let titles = columns
            .iter()
            .map(|c| c.state.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(titles, vec!["Backlog", "Todo", "In Progress", "Done"]);
        assert_eq!(names(&columns[0]), vec!["first", "second"]);
        assert_eq!(names(&columns[2]), vec!["doing"]);
        assert!(columns[3].issues.is_empty());
    }

    #[test]
    fn search_matches_name_or_description_ignoring_case() {
        let mut fx = Fixture::new();
        fx.issue("Fix login bug", 0, 65535.0);
        fx.issue("Update docs", 0, 131070.0);
        let board = fx.board();
        assert_eq!(names(&board.columns("bug")[0]), vec!["Fix login bug"]);
        assert_eq!(names(&board.columns("  BUG ")[0]), vec!["Fix login bug"]);

        fx.issues[1].description_text = Some("Mention the Bug tracker".to_string());
        let board = fx.board();
        assert_eq!(
            names(&board.columns("bug")[0]),
            vec!["Fix login bug", "Update docs"]
        );
    }

    #[test]
    fn single_issues_match_like_the_columns() {
        let mut fx = Fixture::new();
        fx.issue("Update docs", 0, 65535.0);
        fx.issues[0].description_text = Some("login bug repro".to_string());
        let item = &fx.issues[0];
        assert!(item.matches_search(""));
        assert!(item.matches_search(" BUG "));
        assert!(item.matches_search("docs"));
        assert!(!item.matches_search("signup"));
    }

    #[test]
    fn dropping_on_own_column_is_a_noop() {
        let mut fx = Fixture::new();
        let id = fx.issue("card", 1, 65535.0);
        let board = fx.board();
        assert_eq!(
            board.plan_drop(id, Some(DropTarget::State(fx.state(1)))),
            DropPlan::Noop {
                reason: NoopReason::SameState
            }
        );
        assert_eq!(
            board.plan_drop(id, None),
            DropPlan::Noop {
                reason: NoopReason::NoTarget
            }
        );
        assert_eq!(
            board.plan_drop(IssueId::generate(), Some(DropTarget::State(fx.state(2)))),
            DropPlan::Noop {
                reason: NoopReason::UnknownIssue
            }
        );
        assert_eq!(
            board.plan_drop(id, Some(DropTarget::State(StateId::generate()))),
            DropPlan::Noop {
                reason: NoopReason::UnknownTarget
            }
        );
    }

    #[test]
    fn dropping_on_another_column_changes_only_the_state() {
        let mut fx = Fixture::new();
        let id = fx.issue("card", 0, 65535.0);
        let mut board = fx.board();
        let plan = board.plan_drop(id, Some(DropTarget::State(fx.state(2))));
        assert_eq!(
            plan,
            DropPlan::Move {
                issue_id: id,
                from_state: Some(fx.state(0)),
                to_state: fx.state(2),
                sort_order: None,
            }
        );

        board.apply(&plan);
        let columns = board.columns("");
        assert!(columns[0].issues.is_empty());
        assert_eq!(names(&columns[2]), vec!["card"]);
        assert_eq!(board.issue(id).unwrap().issue.sort_order, 65535.0);
    }

    #[test]
    fn dropping_on_a_card_reorders_within_the_column() {
        let mut fx = Fixture::new();
        let a = fx.issue("a", 0, 65535.0);
        let b = fx.issue("b", 0, 131070.0);
        let c = fx.issue("c", 0, 196605.0);
        let mut board = fx.board();

        // Dragging downwards lands after the hovered card.
        let plan = board.plan_drop(a, Some(DropTarget::Issue(b)));
        assert_eq!(
            plan,
            DropPlan::Move {
                issue_id: a,
                from_state: Some(fx.state(0)),
                to_state: fx.state(0),
                sort_order: Some(163837.5),
            }
        );
        board.apply(&plan);
        assert_eq!(names(&board.columns("")[0]), vec!["b", "a", "c"]);

        // Dragging upwards lands before it.
        let plan = board.plan_drop(c, Some(DropTarget::Issue(b)));
        board.apply(&plan);
        assert_eq!(names(&board.columns("")[0]), vec!["c", "b", "a"]);

        assert_eq!(
            board.plan_drop(c, Some(DropTarget::Issue(c))),
            DropPlan::Noop {
                reason: NoopReason::SamePosition
            }
        );
    }

    #[test]
    fn dropping_on_a_card_in_another_column_lands_before_it() {
        let mut fx = Fixture::new();
        let moving = fx.issue("moving", 0, 65535.0);
        let first = fx.issue("first", 1, 65535.0);
        fx.issue("second", 1, 131070.0);
        let mut board = fx.board();

        let plan = board.plan_drop(moving, Some(DropTarget::Issue(first)));
        assert_eq!(
            plan,
            DropPlan::Move {
                issue_id: moving,
                from_state: Some(fx.state(0)),
                to_state: fx.state(1),
                sort_order: Some(0.0),
            }
        );
        board.apply(&plan);
        assert_eq!(
            names(&board.columns("")[1]),
            vec!["moving", "first", "second"]
        );
    }

    #[test]
    fn exhausted_gap_renumbers_the_target_column() {
        let mut fx = Fixture::new();
        let low = fx.issue("low", 0, 1.0);
        let high = fx.issue("high", 0, f64::from_bits(1.0f64.to_bits() + 1));
        let moving = fx.issue("moving", 1, 65535.0);
        let mut board = fx.board();

        let plan = board.plan_drop(moving, Some(DropTarget::Issue(high)));
        assert_eq!(
            plan,
            DropPlan::Renumber {
                issue_id: moving,
                to_state: fx.state(0),
                orders: vec![(low, 65535.0), (moving, 131070.0), (high, 196605.0)],
            }
        );
        board.apply(&plan);
        assert_eq!(names(&board.columns("")[0]), vec!["low", "moving", "high"]);
        assert!(board.columns("")[1].issues.is_empty());
    }

    #[test]
    fn issues_without_a_state_sit_outside_the_columns() {
        let mut fx = Fixture::new();
        let orphan = fx.issue("orphan", 0, 65535.0);
        fx.issues[0].issue.state_id = None;
        let board = fx.board();
        assert!(board.columns("").iter().all(|c| c.issues.is_empty()));
        let unassigned = board.unassigned("");
        assert_eq!(unassigned.len(), 1);
        assert_eq!(unassigned[0].issue.id, orphan);
    }

    #[test]
    fn stats_count_groups_and_overdue_open_work() {
        let mut fx = Fixture::new();
        fx.issue("late backlog", 0, 1.0);
        fx.issue("doing", 2, 2.0);
        fx.issue("done late", 3, 3.0);
        fx.issue("due later", 1, 4.0);
        fx.issues[0].issue.target_date = Some(IssueDate::parse("2026-01-01").unwrap());
        fx.issues[2].issue.target_date = Some(IssueDate::parse("2026-01-01").unwrap());
        fx.issues[3].issue.target_date = Some(IssueDate::parse("2026-12-31").unwrap());

        let stats = fx.board().stats(date!(2026 - 06 - 01));
        assert_eq!(
            stats,
            BoardStats {
                total: 4,
                in_progress: 1,
                completed: 1,
                overdue: 1,
            }
        );
    }
}
