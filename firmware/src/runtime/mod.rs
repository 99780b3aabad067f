use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::{Input, Level, Output, Pull, Speed};
use portable_atomic::AtomicBool;

use valve_core::input::DebouncedInput;
use valve_core::output::TimedOutput;
use valve_core::sonar::{EchoCapture, RangingSensor};
use valve_core::valve::ValveController;

use crate::config;
use crate::hw::{EchoLevel, GpioSink, GpioSource, TriggerPulse, now_millis};

mod control_task;
mod echo_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

pub(super) static ECHO: EchoCapture = EchoCapture::new();
pub(super) static ECHO_HIGH: AtomicBool = AtomicBool::new(false);

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let hal::Peripherals {
        PA0,
        PA1,
        PA5,
        PA6,
        PA7,
        PB3,
        PB4,
        PB5,
        EXTI1,
        ..
    } = hal::init(hal::Config::default());

    let now = now_millis();
    let valve = ValveController::new(
        TimedOutput::new(
            GpioSink(Output::new(PB3, Level::Low, Speed::Low)),
            config::ACTUATOR_POLARITY,
        ),
        TimedOutput::new(
            GpioSink(Output::new(PB4, Level::Low, Speed::Low)),
            config::ACTUATOR_POLARITY,
        ),
        DebouncedInput::new(
            GpioSource(Input::new(PA6, Pull::Up)),
            config::LIMIT_SWITCHES,
            now,
        ),
        DebouncedInput::new(
            GpioSource(Input::new(PA7, Pull::Up)),
            config::LIMIT_SWITCHES,
            now,
        ),
        config::VALVE,
        now,
    );
    let button = DebouncedInput::new(GpioSource(Input::new(PA0, Pull::Up)), config::BUTTON, now);
    let led = TimedOutput::new(
        GpioSink(Output::new(PA5, Level::Low, Speed::Low)),
        config::LED_POLARITY,
    );

    let capture = ECHO.claim().expect("echo capture already claimed");
    let sonar = RangingSensor::new(
        TriggerPulse(Output::new(PB5, Level::Low, Speed::Low)),
        EchoLevel(&ECHO_HIGH),
        capture,
        config::SONAR_RATE_HZ,
    );

    defmt::info!("valve: starting in state {}", valve.status());

    spawner
        .spawn(echo_task::run(ExtiInput::new(PA1, EXTI1, Pull::Down)))
        .expect("failed to spawn echo task");

    spawner
        .spawn(control_task::run(control_task::Board {
            valve,
            button,
            led,
            sonar,
        }))
        .expect("failed to spawn control task");

    core::future::pending::<()>().await;
}
