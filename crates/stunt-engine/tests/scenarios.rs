//! End-to-end Arrange/Act/Assert scenarios over the public store API,
//! including the failure paths a harness would see.

use std::cell::RefCell;
use std::rc::Rc;

use stunt_core::{Harness, MockError, ValidationMode};
use stunt_engine::{MockStore, StoreConfig};

fn make_store(size: usize) -> MockStore {
    MockStore::new(StoreConfig::with_arena_size(size)).unwrap()
}

fn popped_u32(store: &mut MockStore, declarator: &'static str) -> u32 {
    let value = store.pop(declarator, None).unwrap().unwrap();
    u32::from_le_bytes(value.as_ref().try_into().unwrap())
}

#[derive(Default)]
struct RecordingHarness {
    failed: Vec<String>,
    ignored: Vec<String>,
}

impl Harness for RecordingHarness {
    fn fail(&mut self, message: &str) {
        self.failed.push(message.to_string());
    }

    fn ignore(&mut self, message: &str) {
        self.ignored.push(message.to_string());
    }
}

#[test]
fn fifo_primitive_mocks() {
    let mut store = make_store(1024);
    store.add_u32("target", 0xDEAD_BEEF, None).unwrap();
    store.add_u32("target", 0xFACE_ACAD, None).unwrap();
    store.add_u32("target", 0xABAD_FACE, None).unwrap();

    assert_eq!(popped_u32(&mut store, "target"), 0xDEAD_BEEF);
    assert_eq!(popped_u32(&mut store, "target"), 0xFACE_ACAD);
    assert_eq!(popped_u32(&mut store, "target"), 0xABAD_FACE);

    assert_eq!(store.count_calls("target"), 3);
    for (index, expected) in [1u32, 2, 3].into_iter().enumerate() {
        assert_eq!(store.call_order("target", index as u32).unwrap(), expected);
    }
    store.tear_down().unwrap();
}

#[test]
fn reusable_mocks_share_the_global_ordering() {
    let mut store = make_store(1024);
    store.add_reusable("x", &0x11u32.to_le_bytes(), 3, None).unwrap();
    store.add_reusable("y", &0x22u32.to_le_bytes(), 3, None).unwrap();

    for _ in 0..3 {
        assert_eq!(popped_u32(&mut store, "x"), 0x11);
        assert_eq!(popped_u32(&mut store, "y"), 0x22);
    }

    assert_eq!(store.total_calls(), 6);
    for (index, expected) in [1u32, 3, 5].into_iter().enumerate() {
        assert_eq!(store.call_order("x", index as u32).unwrap(), expected);
    }
    for (index, expected) in [2u32, 4, 6].into_iter().enumerate() {
        assert_eq!(store.call_order("y", index as u32).unwrap(), expected);
    }
    assert_eq!(store.count_calls("x"), 3);
    assert_eq!(store.count_callables("x"), 3);
    assert!(!store.has_unconsumed_mocks("x"));
    store.tear_down().unwrap();
}

#[test]
fn override_handler_supplants_the_queue() {
    let mut store = make_store(1024);
    let seen: Rc<RefCell<Vec<(u32, u32, Option<Vec<u8>>)>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    store
        .override_with(
            "z",
            Box::new(move |order, count, spy| {
                sink.borrow_mut().push((order, count, spy.map(<[u8]>::to_vec)));
                Some(vec![0xA5])
            }),
        )
        .unwrap();

    assert_eq!(
        store.pop("z", Some(&[0x7])).unwrap().as_deref(),
        Some(&[0xA5][..])
    );
    assert_eq!(
        store.pop("z", Some(&[0x8])).unwrap().as_deref(),
        Some(&[0xA5][..])
    );

    let seen = seen.borrow();
    assert_eq!(seen[0], (1, 1, Some(vec![0x7])));
    assert_eq!(seen[1], (2, 2, Some(vec![0x8])));

    // Override entries are never consumed, yet never fail teardown.
    assert!(store.has_unconsumed_mocks("z"));
    assert_eq!(store.count_calls("z"), 2);
    assert_eq!(store.count_callables("z"), 1);
    assert_eq!(store.call_order("z", 0).unwrap(), 0);
    assert_eq!(store.spy_data("z", 0).unwrap(), None);
    assert_eq!(store.mock_data("z", 0).unwrap(), None);
    store.tear_down().unwrap();
}

#[test]
fn enforced_order_rejects_the_out_of_turn_pop() {
    let mut store = make_store(1024);
    store.enforce_call_order_tracking();
    store.add_empty("a", None).unwrap();
    store.add_empty("b", None).unwrap();
    assert_eq!(
        store.pop("b", None).unwrap_err(),
        MockError::OutOfOrder { declarator: "b" }
    );
}

#[test]
fn enforced_order_accepts_the_seeded_sequence() {
    let mut store = make_store(1024);
    store.add_empty("init", None).unwrap();
    store.add_empty("configure", None).unwrap();
    store.add_empty("start", None).unwrap();
    store.enforce_call_order_tracking();

    store.pop("init", None).unwrap();
    store.pop("configure", None).unwrap();
    store.pop("start", None).unwrap();
    store.tear_down().unwrap();
}

#[test]
fn call_orders_survive_the_natural_counter_limit() {
    // Narrow layout: the 8-bit entry order field maxes out at 255.
    let mut store = make_store(4096);
    for value in 0..257u32 {
        store.spy_on_u32("spied", value).unwrap();
    }

    // Orders below the limit live in the entry headers.
    assert_eq!(store.call_order("spied", 0).unwrap(), 1);
    assert_eq!(store.call_order("spied", 253).unwrap(), 254);
    // From the limit on, headers hold the sentinel and the true order
    // lives in extended call-data blocks.
    assert_eq!(store.call_order("spied", 254).unwrap(), 255);
    assert_eq!(store.call_order("spied", 255).unwrap(), 256);
    assert_eq!(store.call_order("spied", 256).unwrap(), 257);

    // The recorded spy bytes stay exact on both sides of the limit.
    for index in [0u32, 200, 254, 256] {
        assert_eq!(
            store.spy_data("spied", index).unwrap(),
            Some(&index.to_le_bytes()[..])
        );
    }
    assert_eq!(store.count_calls("spied"), 257);
}

#[test]
fn teardown_flags_the_unconsumed_mock() {
    let mut store = make_store(1024);
    store.add_u32("left_behind", 0x1, None).unwrap();
    assert_eq!(
        store.tear_down(),
        Err(MockError::UnconsumedAtTeardown {
            declarator: "left_behind"
        })
    );
}

#[test]
fn teardown_passes_once_everything_is_consumed() {
    let mut store = make_store(1024);
    store.tear_down().unwrap();

    store.add_u32("f", 0x1, None).unwrap();
    store.pop("f", None).unwrap();
    store.tear_down().unwrap();

    store.reset();
    store.add_u32("f", 0x2, None).unwrap();
    store.add_u32("f", 0x3, None).unwrap();
    store.pop("f", None).unwrap();
    assert!(store.tear_down().is_err());
}

#[test]
fn strict_and_permissive_modes_route_to_different_signals() {
    let mut harness = RecordingHarness::default();

    let mut strict = make_store(1024);
    let error = strict.pop("missing", None).unwrap_err();
    strict.report_failure(&mut harness, &error);
    assert_eq!(harness.failed.len(), 1);
    assert!(harness.failed[0].contains("missing"));
    assert!(harness.ignored.is_empty());

    let mut permissive = MockStore::new(StoreConfig {
        validation: ValidationMode::Permissive,
        ..StoreConfig::with_arena_size(1024)
    })
    .unwrap();
    let error = permissive.pop("missing", None).unwrap_err();
    permissive.report_failure(&mut harness, &error);
    assert_eq!(harness.failed.len(), 1);
    assert_eq!(harness.ignored.len(), 1);
}

#[test]
fn spy_accounting_matches_the_arena_geometry() {
    let mut store = make_store(1024);
    let entry_size = store.layout().entry_size();
    let data = [0xD1u8; 9];

    store.spy_only("watched", &data).unwrap();

    // One bare entry from the low end, one 12-byte compact block (9 rounded
    // up) from the high end.
    assert_eq!(store.free_space(), 1024 - entry_size - 12);
    assert_eq!(store.total_calls(), 1);
    assert_eq!(store.count_calls("watched"), 1);
    assert!(store.handle("watched", 0).is_some());
    assert_eq!(store.call_order("watched", 0).unwrap(), 1);
    assert_eq!(store.spy_data("watched", 0).unwrap(), Some(&data[..]));
}

#[test]
fn multiple_spies_keep_their_own_bytes_and_orders() {
    let mut store = make_store(1024);
    let data = [
        0xA1A1_A1A1u32,
        0xAAAA_2222,
        0x1BB1_B11B,
        0xBB22_22BB,
        0xBB33_BB33,
        0xFEFE_FEFE,
    ];
    store.add_empty("unrelated", None).unwrap();
    for value in data {
        store.spy_on_u32("watched", value).unwrap();
    }

    assert_eq!(store.total_calls(), data.len() as u32);
    assert_eq!(store.count_calls("watched"), data.len() as u32);
    for (index, value) in data.into_iter().enumerate() {
        assert_eq!(
            store.call_order("watched", index as u32).unwrap(),
            index as u32 + 1
        );
        assert_eq!(
            store.spy_data("watched", index as u32).unwrap(),
            Some(&value.to_le_bytes()[..])
        );
    }
}

#[test]
fn callbacks_observe_the_shared_call_sequence() {
    let mut store = make_store(1024);
    let orders: Rc<RefCell<Vec<(u32, &'static str)>>> = Rc::new(RefCell::new(Vec::new()));

    for declarator in ["first", "second"] {
        let sink = Rc::clone(&orders);
        store
            .add_u32(
                declarator,
                0,
                Some(Box::new(move |order, _, _| {
                    sink.borrow_mut().push((order, declarator));
                })),
            )
            .unwrap();
    }

    store.pop("second", None).unwrap();
    store.pop("first", None).unwrap();

    assert_eq!(*orders.borrow(), vec![(1, "second"), (2, "first")]);
    assert_eq!(store.call_order("second", 0).unwrap(), 1);
    assert_eq!(store.call_order("first", 0).unwrap(), 2);
}

#[test]
fn infinite_mock_replays_and_records_every_use() {
    let mut store = make_store(2048);
    store
        .add_infinite("polled", &0xFEED_ACADu32.to_le_bytes(), None)
        .unwrap();

    assert!(store.has_mocks("polled"));
    assert!(store.has_unconsumed_mocks("polled"));
    assert_eq!(store.count_calls("polled"), 0);

    for index in 0..8u32 {
        let spy = 0xFACE_0000 + index;
        let value = store.pop_with_u32_spy("polled", spy).unwrap().unwrap();
        assert_eq!(value.as_ref(), 0xFEED_ACADu32.to_le_bytes());
        drop(value);
        assert_eq!(store.count_calls("polled"), index + 1);
        assert_eq!(
            store.spy_data("polled", index).unwrap(),
            Some(&spy.to_le_bytes()[..])
        );
    }

    // Still unconsumed: infinite mocks never leave that state, so a test
    // that seeds one cannot pass consumption validation.
    assert!(store.has_unconsumed_mocks("polled"));
    assert!(store.tear_down().is_err());
}

#[test]
fn reusable_mock_with_callback_fires_on_every_use() {
    let mut store = make_store(1024);
    let count = Rc::new(RefCell::new(0u32));
    let sink = Rc::clone(&count);
    store
        .add_reusable(
            "retried",
            &[0xEE],
            2,
            Some(Box::new(move |_, mock, _| {
                assert_eq!(mock, Some(&[0xEE][..]));
                *sink.borrow_mut() += 1;
            })),
        )
        .unwrap();

    store.pop("retried", None).unwrap();
    store.pop("retried", None).unwrap();
    assert_eq!(*count.borrow(), 2);
    store.tear_down().unwrap();
}

#[test]
fn empty_reusable_pops_as_none_until_exhausted() {
    let mut store = make_store(1024);
    store.add_reusable("checked", &[], 2, None).unwrap();
    assert_eq!(store.pop("checked", None).unwrap(), None);
    assert_eq!(store.pop("checked", None).unwrap(), None);
    assert_eq!(
        store.pop("checked", None).unwrap_err(),
        MockError::NoMoreMocks {
            declarator: "checked"
        }
    );
    store.tear_down().unwrap();
}

#[test]
fn seeding_beyond_the_arena_fails_and_permissive_mode_reports_ignore() {
    let mut store = MockStore::new(StoreConfig {
        validation: ValidationMode::Permissive,
        ..StoreConfig::with_arena_size(64)
    })
    .unwrap();
    let mut harness = RecordingHarness::default();

    store.add("big", &[0u8; 40], None).unwrap();
    let error = store.add("bigger", &[0u8; 40], None).unwrap_err();
    assert!(matches!(
        error,
        MockError::OutOfSpace {
            declarator: "bigger",
            ..
        }
    ));
    store.report_failure(&mut harness, &error);
    assert!(harness.failed.is_empty());
    assert_eq!(harness.ignored.len(), 1);
}

// A user-like end-to-end flow: a mix of spied and unspied pops across two
// declarators, verified before and after the Act phase.
#[test]
fn user_like_call_details_flow() {
    let mut store = make_store(2048);
    let data = [0xAAAA_AAAAu32, 0xBBBB_BBBB, 0, 0xCCCC_CCCC, 0xDDDD_DDDD];

    store.add_u32("single", 0x5EED, None).unwrap();
    for (index, _) in data.iter().enumerate() {
        store.add_u32("repeated", index as u32, None).unwrap();
    }

    // Before any call: orders are zero, no spy data anywhere.
    assert_eq!(store.call_order("single", 0).unwrap(), 0);
    assert_eq!(store.spy_data("single", 0).unwrap(), None);
    assert_eq!(store.count_calls("single"), 0);
    assert_eq!(store.count_calls("repeated"), 0);
    for index in 0..data.len() as u32 {
        assert_eq!(store.call_order("repeated", index).unwrap(), 0);
        assert_eq!(store.spy_data("repeated", index).unwrap(), None);
    }

    store.pop_with_u32_spy("single", 0x0BB5).unwrap();
    for value in data {
        if value != 0 {
            store.pop_with_u32_spy("repeated", value).unwrap();
        } else {
            store.pop("repeated", None).unwrap();
        }
    }

    // After: one call for `single`, five for `repeated`, orders 2..=6.
    assert_eq!(store.count_calls("single"), 1);
    assert_eq!(store.count_calls("repeated"), data.len() as u32);
    assert_eq!(store.call_order("single", 0).unwrap(), 1);
    assert!(store.spy_data("single", 0).unwrap().is_some());
    for (index, value) in data.into_iter().enumerate() {
        assert_eq!(
            store.call_order("repeated", index as u32).unwrap(),
            index as u32 + 2
        );
        if value != 0 {
            assert_eq!(
                store.spy_data("repeated", index as u32).unwrap(),
                Some(&value.to_le_bytes()[..])
            );
        } else {
            assert_eq!(store.spy_data("repeated", index as u32).unwrap(), None);
        }
    }
    store.tear_down().unwrap();
}
