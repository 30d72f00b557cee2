mod controller {
    use cels_runtime::prelude::*;
    use cels_test_utils::*;

    fn test_controller(words: usize) -> ExecutionController {
        let controller = ExecutionController::new(FrameStack::with_capacity(words));
        controller.set_error_handler(panicking_error_handler);
        controller
    }

    fn noop_step(_record: *mut (), _controller: &ExecutionController) {}

    mod dispatch {
        use super::*;

        #[test]
        fn null_context_has_nothing_to_do() {
            let controller = test_controller(16);
            assert!(!controller.run_step());
            assert!(!controller.run_step());
        }

        #[test]
        fn jump_end_terminates_dispatch() {
            let controller = test_controller(64);
            let frame = unsafe { controller.push::<SpinsForever>() } as *mut SpinsForever;
            controller.jump_to(frame, SpinsForever::f0);
            controller.set_yield_check(yield_after_each_step);
            assert!(controller.run_step());
            controller.jump_end();
            assert!(!controller.run_step());
            assert_eq!(unsafe { (*frame).steps }, 1);
        }

        #[test]
        fn suspension_ends_the_tick_and_is_cleared() {
            let controller = test_controller(64);
            let record = start_root::<CountdownMultiframe>(&controller, |frame| {
                frame.params.suspends = 3;
                frame.params.value = 9;
            });

            // One suspension per tick.
            assert!(controller.run_step());
            assert!(controller.run_step());
            assert!(controller.run_step());
            // The final tick runs the return and finds the null context.
            assert!(!controller.run_step());

            assert_eq!(unsafe { (*record).return_value }, 9);
            controller.pop();
            assert_eq!(controller.stack().top(), 0);
        }

        #[test]
        fn yield_predicate_bounds_steps_per_tick() {
            let controller = test_controller(64);
            controller.set_yield_check(yield_after_each_step);
            let frame = unsafe { controller.push::<SpinsForever>() } as *mut SpinsForever;
            controller.jump_to(frame, SpinsForever::f0);

            for expected in 1..=3 {
                assert!(controller.run_step());
                assert_eq!(unsafe { (*frame).steps }, expected);
            }
        }
    }

    mod call_return {
        use super::*;

        #[test]
        fn ret_restores_context_and_top() {
            let controller = test_controller(32);
            let mut callee_record = 0i32;
            let mut return_record = 0i32;
            let callee =
                ExecutionContext::new(&mut callee_record as *mut i32 as *mut (), noop_step);
            let return_to =
                ExecutionContext::new(&mut return_record as *mut i32 as *mut (), noop_step);

            let top_before = controller.stack().top();
            controller.call(callee, return_to);
            assert_eq!(controller.current_context(), callee);
            assert!(controller.stack().top() > top_before);

            controller.ret();
            assert_eq!(controller.current_context(), return_to);
            assert_eq!(controller.stack().top(), top_before);
        }

        #[test]
        fn single_controller_call_and_return() {
            let controller = test_controller(64);
            controller.set_yield_check(yield_after_each_step);
            let caller = start_root::<CallsHelper>(&controller, |_| {});

            // The entry step pushes the helper and calls into it.
            assert!(controller.run_step());
            let ctx = controller.current_context();
            assert_eq!(ctx.step(), Some(ReturnsConstant::f0 as StepFn));
            let top_during_call = controller.stack().top();

            // The helper returns immediately; control moves to the caller's
            // post-call step with the return context popped.
            assert!(controller.run_step());
            let ctx = controller.current_context();
            assert_eq!(ctx.step(), Some(CallsHelper::f1 as StepFn));
            assert_eq!(ctx.record(), caller as *mut ());
            assert!(controller.stack().top() < top_during_call);

            // The post-call step reads the result, pops the helper, returns.
            assert!(controller.run_step());
            assert!(!controller.run_step());

            let record = unsafe { &*caller };
            assert!(record.finished);
            assert_eq!(record.return_value, 7);
            controller.pop();
            assert_eq!(controller.stack().top(), 0);
        }
    }

    mod stack_faults {
        use super::*;
        use std::sync::atomic::{AtomicUsize, Ordering};

        static OVERFLOW_REPORTS: AtomicUsize = AtomicUsize::new(0);

        fn counting_panicking_handler(message: &str) {
            OVERFLOW_REPORTS.fetch_add(1, Ordering::SeqCst);
            panic!("{message}");
        }

        #[test]
        fn oversized_push_reports_overflow_exactly_once() {
            let controller = ExecutionController::new(FrameStack::with_capacity(16));
            controller.set_error_handler(counting_panicking_handler);

            let message = expect_fault(|| {
                let _ = unsafe { controller.push::<BulkyRecord>() };
            });
            assert_eq!(message, "Cels: Stack overflow");
            assert_eq!(OVERFLOW_REPORTS.load(Ordering::SeqCst), 1);
        }

        #[test]
        fn pop_on_empty_reports_pop_error() {
            let controller = test_controller(16);
            let message = expect_fault(|| controller.pop());
            assert_eq!(message, "Cels: Stack pop error");
        }

        #[test]
        fn peek_on_empty_reports_peek_error() {
            let controller = test_controller(16);
            let message = expect_fault(|| {
                let _ = unsafe { controller.peek::<SumMultiframe>() };
            });
            assert_eq!(message, "Cels: Stack peek error");
        }

        #[test]
        fn delegation_without_a_runtime_is_fatal() {
            let controller = test_controller(16);
            let message = expect_fault(|| {
                let _ = controller.find_free_controller();
            });
            assert_eq!(message, "No runtime set");

            let message = expect_fault(|| controller.release_from_runtime());
            assert_eq!(message, "No runtime set");
        }
    }

    mod multiframe_execution {
        use super::*;

        #[test]
        fn sum_accumulates_one_element_per_tick() {
            let controller = test_controller(64);
            let record = start_root::<SumMultiframe>(&controller, |frame| {
                frame.params.v = [1, 2, 3, 4];
                frame.params.n = 4;
            });

            for _ in 0..4 {
                assert!(controller.run_step());
            }
            assert!(!controller.run_step());

            assert_eq!(unsafe { (*record).return_value }, 10);
            controller.pop();
            assert_eq!(controller.stack().top(), 0);
        }

        #[test]
        fn push_then_peek_return_the_same_record() {
            let controller = test_controller(64);
            let pushed = unsafe { controller.push::<SumMultiframe>() } as *mut SumMultiframe;
            let peeked = unsafe { controller.peek::<SumMultiframe>() } as *mut SumMultiframe;
            assert_eq!(pushed, peeked);
        }
    }

    #[cfg(feature = "named")]
    mod call_tracing {
        use super::*;
        use std::cell::RefCell;

        thread_local! {
            static EVENTS: RefCell<Vec<String>> = RefCell::new(Vec::new());
        }

        fn record_event(event: &str, name: &str) {
            EVENTS.with(|events| events.borrow_mut().push(format!("{event} {name}")));
        }

        #[test]
        fn named_records_trace_calls_and_returns() {
            let controller = test_controller(64);
            controller.set_trace_handler(record_event);
            start_root::<CallsHelper>(&controller, |_| {});
            assert!(!controller.run_step());

            EVENTS.with(|events| {
                assert_eq!(
                    *events.borrow(),
                    vec![
                        "CALL calls_helper",
                        "CALL returns_constant",
                        "RET FROM returns_constant",
                        "RET FROM calls_helper",
                    ]
                );
            });
        }
    }
}
