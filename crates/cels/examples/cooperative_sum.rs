//! Runs a handwritten frame record in the shape the upstream translator
//! emits, accumulating one array element per tick.
//!
//! The record below is what the translator produces for a function like:
//!
//! ```text
//! fn sum_multiframe(v: int[4], n: int) -> int {
//!     let s = 0;
//!     let i = 0;
//!     while i < n {
//!         s = s + v[i];
//!         i = i + 1;
//!         suspend;
//!     }
//!     return s;
//! }
//! ```

use cels::prelude::*;

#[derive(Default)]
struct SumMultiframe {
    params: SumParams,
    return_value: i32,
    s: i32,
    i: i32,
}

#[derive(Default)]
struct SumParams {
    v: [i32; 4],
    n: i32,
}

unsafe impl FrameRecord for SumMultiframe {
    const NAME: Option<&'static str> = Some("sum_multiframe");
}

impl Multiframe for SumMultiframe {
    type Output = i32;
    const ENTRY: StepFn = Self::f0;

    fn return_value(&self) -> i32 {
        self.return_value
    }
}

impl SumMultiframe {
    fn f0(record: *mut (), controller: &ExecutionController) {
        let ctx = unsafe { &mut *record.cast::<Self>() };
        ctx.s = 0;
        ctx.i = 0;
        controller.jump_to(record.cast::<Self>(), Self::f1);
    }

    fn f1(record: *mut (), controller: &ExecutionController) {
        let ctx = unsafe { &mut *record.cast::<Self>() };
        if ctx.i < ctx.params.n {
            ctx.s += ctx.params.v[ctx.i as usize];
            ctx.i += 1;
            controller.suspend();
            controller.jump_to(record.cast::<Self>(), Self::f1);
        } else {
            ctx.return_value = ctx.s;
            controller.ret();
        }
    }
}

fn main() {
    let cels = Cels::new();
    let record = cels.start::<SumMultiframe>(|frame| {
        frame.params.v = [1, 2, 3, 4];
        frame.params.n = 4;
    });

    let mut ticks = 0;
    while cels.tick() {
        ticks += 1;
        let partial = unsafe { (*record).s };
        println!("tick {ticks}: partial sum = {partial}");
    }

    let result = unsafe { (*record).return_value };
    println!("finished after {ticks} ticks: {result}");
}
