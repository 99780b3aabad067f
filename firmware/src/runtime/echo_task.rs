use embassy_futures::select::{Either, select};
use embassy_stm32::exti::ExtiInput;
use embassy_time::Timer;
use portable_atomic::Ordering;

use super::{ECHO, ECHO_HIGH};
use crate::config;
use crate::hw::now_micros;
use crate::telemetry;

/// Timestamps echo edges into [`ECHO`] and mirrors the line level for the
/// sensor's "still ringing" check.
#[embassy_executor::task]
pub async fn run(mut echo: ExtiInput<'static>) -> ! {
    loop {
        echo.wait_for_rising_edge().await;
        ECHO.record_rise(now_micros());
        ECHO_HIGH.store(true, Ordering::Release);

        match select(
            echo.wait_for_falling_edge(),
            Timer::after(config::ECHO_TIMEOUT),
        )
        .await
        {
            Either::First(()) => ECHO.record_fall(now_micros()),
            Either::Second(()) => telemetry::log_echo_timeout(),
        }
        ECHO_HIGH.store(echo.is_high(), Ordering::Release);
    }
}
