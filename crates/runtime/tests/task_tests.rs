mod tasks {
    use cels_runtime::prelude::*;
    use cels_test_utils::*;
    use std::pin::Pin;

    fn test_runtime(controllers: usize) -> Pin<Box<CelsRuntime>> {
        let runtime = CelsRuntime::with_settings(RuntimeSettings {
            controllers,
            stack_words: 128,
            error_handler: panicking_error_handler,
            ..RuntimeSettings::default()
        });
        match runtime {
            Ok(runtime) => runtime,
            Err(error) => panic!("{error}"),
        }
    }

    #[test]
    fn task_runs_on_its_own_controller_and_reports_readiness() {
        let runtime = test_runtime(2);
        let parent = start_root::<SpawnsCountdown>(runtime.main_controller(), |frame| {
            frame.params.suspends = 3;
            frame.params.value = 42;
        });

        // Tick 1 spawns the task; its body suspends three times.
        assert!(runtime.run_step());
        assert!(runtime.is_busy(1));
        let task = unsafe { &(*parent).task };
        assert!(!task.is_ready());
        assert_eq!(task.result(), None);

        assert!(runtime.run_step());
        assert!(runtime.run_step());
        assert!(!task.is_ready());

        // Tick 4: the body returns; the runner records the result and
        // releases its controller.
        assert!(runtime.run_step());
        assert!(task.is_ready());
        assert_eq!(task.result(), Some(42));
        assert!(!runtime.is_busy(1));
        assert_eq!(runtime.controller(1).unwrap().stack().top(), 0);

        // Tick 5: the parent copies the result and returns.
        assert!(!runtime.run_step());
        assert_eq!(unsafe { (*parent).return_value }, 42);
    }

    #[test]
    fn detached_task_completes_without_touching_the_handle() {
        let runtime = test_runtime(2);
        let main = runtime.main_controller();
        let parent = unsafe { main.push::<DetachingSpawner>() } as *mut DetachingSpawner;
        unsafe {
            (*parent).params.suspends = 3;
            (*parent).params.value = 42;
        }
        main.jump_to(parent, DetachingSpawner::f0);

        // Tick 1 spawns; tick 2 detaches and ends the parent; ticks 2 and 3
        // keep the task suspending; tick 4 completes it.
        assert_eq!(ticks_until_idle(&runtime, 8), 3);

        let task = unsafe { &(*parent).task };
        assert!(!task.is_ready());
        assert_eq!(task.result(), None);
        assert!(!runtime.is_busy(1));
        assert_eq!(runtime.controller(1).unwrap().stack().top(), 0);
    }

    #[test]
    fn detach_is_idempotent() {
        let runtime = test_runtime(2);
        let main = runtime.main_controller();
        let parent = unsafe { main.push::<DetachingSpawner>() } as *mut DetachingSpawner;
        unsafe {
            (*parent).params.suspends = 2;
            (*parent).params.value = 1;
        }
        main.jump_to(parent, DetachingSpawner::f0);
        assert!(runtime.run_step());

        let task = unsafe { &(*parent).task };
        task.detach();
        task.detach();
        assert!(!task.is_ready());

        ticks_until_idle(&runtime, 8);
        assert!(!task.is_ready());
        assert_eq!(task.result(), None);
        assert!(!runtime.is_busy(1));
    }

    #[test]
    fn unit_tasks_need_no_result_slot() {
        let runtime = test_runtime(2);
        let main = runtime.main_controller();

        let task = Task::<()>::default();
        unsafe {
            task.init::<(), WaitsMultiframe>(main, &(), |_, frame| {
                frame.params.suspends = 1;
            });
        }
        assert!(!task.is_ready());

        // Tick 1: the body suspends once. Tick 2: it returns; only the idle
        // main controller is left.
        assert!(runtime.run_step());
        assert!(!runtime.run_step());
        assert!(task.is_ready());
        assert_eq!(task.result(), Some(()));
        assert!(!runtime.is_busy(1));
    }

    #[test]
    fn spawning_past_the_pool_is_fatal() {
        let runtime = test_runtime(2);
        let main = runtime.main_controller();
        let _task_controller = main.find_free_controller();

        let task = Task::<i32>::default();
        let message = expect_fault(|| unsafe {
            task.init::<(), CountdownMultiframe>(main, &(), |_, frame| {
                frame.params.suspends = 0;
                frame.params.value = 1;
            });
        });
        assert_eq!(message, "Controllers busy");
    }
}
