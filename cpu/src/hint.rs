// cpu hints for spin-wait loops

// spin-loop hint for tight polling loops
// not a memory fence, maps to PAUSE on x86/x86_64 and YIELD on aarch64
#[inline(always)]
pub fn cpu_pause() {
    core::hint::spin_loop();
}
