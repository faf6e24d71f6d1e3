//! Property tests: inverse symmetry, deletion completeness and required
//! references hold after any sequence of operations.

use std::sync::Arc;

use ontoloom_foundation::ObjectId;
use ontoloom_schema::ObjectModel;
use ontoloom_storage::{Detached, ModelState, WorkingSet};
use proptest::prelude::*;

const SCHEMA: &str = r#"<Classes>
  <Class name="Region">
    <Collection>regions</Collection>
    <Attribute type="text" is_key="true">name</Attribute>
    <Reference type="Region" multiplicity="multi" required="false" inverse="parents">direct_constituents</Reference>
    <Reference type="Region" multiplicity="multi" required="false" inverse="direct_constituents">parents</Reference>
    <Reference type="Region" multiplicity="mono" required="false" inverse="twin">twin</Reference>
    <Reference type="Region" multiplicity="multi" required="false">near</Reference>
  </Class>
  <Class name="Worker">
    <Collection>workers</Collection>
    <Attribute type="text" is_key="true">name</Attribute>
    <Reference type="Desk" multiplicity="mono" required="false" inverse="owner">desk</Reference>
  </Class>
  <Class name="Desk">
    <Collection>desks</Collection>
    <Attribute type="text" is_key="true">id</Attribute>
    <Reference type="Worker" multiplicity="mono" required="true" inverse="desk">owner</Reference>
  </Class>
</Classes>"#;

const SIZE: usize = 6;
const REFERENCES: [&str; 4] = ["direct_constituents", "parents", "twin", "near"];

#[derive(Clone, Debug)]
enum Op {
    Link(usize, usize, usize),
    Unlink(usize, usize, usize),
    Delete(usize),
}

fn op() -> impl Strategy<Value = Op> {
    let pair = (0..SIZE, 1..SIZE, 0..REFERENCES.len());
    prop_oneof![
        4 => pair.clone().prop_map(|(a, d, r)| Op::Link(a, (a + d) % SIZE, r)),
        2 => pair.prop_map(|(a, d, r)| Op::Unlink(a, (a + d) % SIZE, r)),
        1 => (0..SIZE).prop_map(Op::Delete),
    ]
}

const WORKERS: usize = 4;
const DESKS: usize = 3;

#[derive(Clone, Debug)]
enum DeskOp {
    /// `Desk.owner` from the desk side.
    Assign(usize, usize),
    /// `Worker.desk` from the worker side.
    Take(usize, usize),
    Release(usize, usize),
}

fn desk_op() -> impl Strategy<Value = DeskOp> {
    prop_oneof![
        (0..DESKS, 0..WORKERS).prop_map(|(d, w)| DeskOp::Assign(d, w)),
        (0..WORKERS, 0..DESKS).prop_map(|(w, d)| DeskOp::Take(w, d)),
        (0..DESKS, 0..WORKERS).prop_map(|(d, w)| DeskOp::Release(d, w)),
    ]
}

fn worker(i: usize) -> ObjectId {
    ObjectId::new("Worker", format!("W{i}"))
}

fn desk(i: usize) -> ObjectId {
    ObjectId::new("Desk", format!("D{i}"))
}

/// Every desk starts out owned by the worker with the same index.
fn office() -> ModelState {
    let model = Arc::new(ObjectModel::compile(SCHEMA).unwrap());
    let base = ModelState::new(model);
    let mut ws = WorkingSet::new(&base, &Detached);
    for i in 0..WORKERS {
        ws.create("Worker", &format!("W{i}"), vec![]).unwrap();
    }
    for i in 0..DESKS {
        ws.create("Desk", &format!("D{i}"), vec![]).unwrap();
        ws.link(&desk(i), "owner", &worker(i)).unwrap();
    }
    ws.finish().unwrap().state
}

fn apply_desk(state: &ModelState, op: &DeskOp) -> ModelState {
    let mut ws = WorkingSet::new(state, &Detached);
    let result = match op {
        DeskOp::Assign(d, w) => ws.link(&desk(*d), "owner", &worker(*w)),
        DeskOp::Take(w, d) => ws.link(&worker(*w), "desk", &desk(*d)),
        DeskOp::Release(d, w) => ws.unlink(&desk(*d), "owner", &worker(*w)),
    };
    match result.and_then(|()| ws.finish()) {
        Ok(delta) => delta.state,
        Err(_) => state.clone(),
    }
}

fn id(i: usize) -> ObjectId {
    ObjectId::new("Region", format!("R{i}"))
}

fn populated() -> ModelState {
    let model = Arc::new(ObjectModel::compile(SCHEMA).unwrap());
    let base = ModelState::new(model);
    let mut ws = WorkingSet::new(&base, &Detached);
    for i in 0..SIZE {
        ws.create("Region", &format!("R{i}"), vec![]).unwrap();
    }
    ws.finish().unwrap().state
}

/// Applies one operation in its own working set; failed operations leave
/// the snapshot untouched.
fn apply(state: &ModelState, op: &Op) -> ModelState {
    let mut ws = WorkingSet::new(state, &Detached);
    let result = match op {
        Op::Link(a, b, r) => ws.link(&id(*a), REFERENCES[*r], &id(*b)),
        Op::Unlink(a, b, r) => ws.unlink(&id(*a), REFERENCES[*r], &id(*b)),
        Op::Delete(a) => ws.delete(&id(*a)),
    };
    match result.and_then(|()| ws.finish()) {
        Ok(delta) => delta.state,
        Err(_) => state.clone(),
    }
}

fn check(state: &ModelState) -> Result<(), TestCaseError> {
    for object in state.objects() {
        for (name, slot) in object.references() {
            let inverse = &object.descriptor().reference(name).unwrap().inverse;
            for target in slot.targets() {
                let Some(partner) = state.get(target) else {
                    return Err(TestCaseError::fail(format!("{} points at missing {target}", object.id())));
                };
                if let Some(inverse) = inverse {
                    prop_assert!(
                        partner.reference(inverse).unwrap().contains(object.id()),
                        "{}.{name} -> {target} has no {inverse} back",
                        object.id()
                    );
                }
            }
        }
    }
    Ok(())
}

proptest! {
    #[test]
    fn inverses_stay_symmetric(ops in prop::collection::vec(op(), 1..40)) {
        let mut state = populated();
        for op in &ops {
            state = apply(&state, op);
            check(&state)?;
        }
    }

    #[test]
    fn deleted_objects_are_unreachable(ops in prop::collection::vec(op(), 1..40), victim in 0..SIZE) {
        let mut state = populated();
        for op in &ops {
            state = apply(&state, op);
        }
        if state.contains(&id(victim)) {
            state = apply(&state, &Op::Delete(victim));
            prop_assert!(!state.contains(&id(victim)));
            prop_assert!(state.incoming(&id(victim)).is_empty());
            for object in state.objects() {
                for (_, slot) in object.references() {
                    prop_assert!(!slot.contains(&id(victim)));
                }
            }
        }
    }

    #[test]
    fn required_mono_partners_are_never_left_empty(ops in prop::collection::vec(desk_op(), 1..30)) {
        let mut state = office();
        for op in &ops {
            state = apply_desk(&state, op);
            check(&state)?;
            for d in 0..DESKS {
                let owner = state.get(&desk(d)).unwrap().reference("owner").unwrap();
                prop_assert_eq!(owner.targets().count(), 1, "D{} lost its owner after {:?}", d, op);
            }
        }
    }

    #[test]
    fn failed_operations_change_nothing(a in 0..SIZE) {
        let state = populated();
        let before = state.clone();
        let mut ws = WorkingSet::new(&state, &Detached);
        ws.link(&id(a), "direct_constituents", &id((a + 1) % SIZE)).unwrap();
        prop_assert!(ws.link(&id(a), "no_such_reference", &id(a)).is_err());
        drop(ws);
        prop_assert_eq!(state, before);
    }
}
