//! Housekeeping firmware for the handheld's companion MCU.
//!
//! The pi is the brains of the device; this chip owns everything that has
//! to work while the pi is off or busy: the power switch, the wall clock,
//! button and joystick sampling, battery and board-temperature
//! monitoring, ambient light and the microphone loudness trigger.
//! Reportable changes pull the attention line low until
//! the pi picks the status up over the serial link.
//!
//! The first 0x200 bytes of flash belong to the resident bootloader the
//! pi uses to reprogram this chip; build.rs relocates `.text` above them.
//!
//! Serial link at 9600bps:
//!     TX PA10
//!     RX PA9
#![no_std]
#![no_main]

use panic_rtt_target as _;

#[rtic::app(device = atsamx7x_hal::pac, peripherals = true, dispatchers = [IXC, I2SC0])]
mod app {
    // Backend dependencies
    use atsamx7x_hal as hal;
    use dwt_systick_monotonic::{DwtSystick, ExtU32};
    use hal::afec::*;
    use hal::clocks::*;
    use hal::efc::*;
    use hal::ehal::adc::OneShot;
    use hal::ehal::digital::v2::{InputPin, OutputPin, ToggleableOutputPin};
    use hal::ehal::serial::{Read, Write};
    use hal::fugit::RateExtU32;
    use hal::generics::events::EventHandler;
    use hal::pio::*;
    use hal::serial::uart::UartConfiguration;
    use hal::serial::{uart::*, ExtBpsU32};
    use rtt_target::{rprint, rprintln, rtt_init_print};

    // Application dependencies
    use corncobs::ZERO;
    use nb::block;
    use pi_and_companion::power::{
        classify, temp_x10_from_volts, vbatt_x100, Debounce, PiRail, PowerSource,
    };
    use pi_and_companion::{
        deserialize_crc_cobs, serialize_crc_cobs, DateTime, ExtendedStatus, Request, Response,
        Status, MAX_FRAME, PACKET_SIZE,
    };

    /// Ticks per second of the housekeeping timer (10 ms period).
    const TICK_HZ: u16 = 100;

    #[monotonic(binds = SysTick, default = true)]
    type Mono = DwtSystick<16_000_000>;

    /// Everything the pi can observe or mutate over the link.
    pub struct HouseKeeping {
        status: Status,
        estatus: ExtendedStatus,
        time: DateTime,
        /// Actual state of the pi rail. The power-on bit in `status` only
        /// reports a cold boot until the pi acknowledges it.
        rail: PiRail,
        /// Pull the attention line low on the next tick.
        attention: bool,
        recording: bool,
        audio: [u8; PACKET_SIZE * 2],
        audio_index: usize,
        /// Offset of the last completely filled buffer half.
        ready_half: Option<usize>,
    }

    /// The AFEC and the microphone pin travel together; both the slow
    /// housekeeping tick and the 8 kHz recording task sample through them.
    pub struct Analog {
        afec: Afec<Afec0>,
        mic: Pin<PE4, Input>,
    }

    #[shared]
    struct Shared {
        state: HouseKeeping,
        pi_en: Pin<PA0, Output>,
        analog: Analog,
    }

    #[local]
    struct Local {
        tx: Tx<Uart0>,
        rx: Rx<Uart0>,
        backlight: Pin<PA2, Output>,
        attention_pin: Pin<PA1, Output>,
        led: Pin<PA5, Output>,
        btn_lvol: Pin<PA3, Input>,
        btn_rvol: Pin<PA4, Input>,
        btn_joy: Pin<PB0, Input>,
        charge: Pin<PB1, Input>,
        joy_x_pin: Pin<PD30, Input>,
        joy_y_pin: Pin<PA21, Input>,
        vbatt_pin: Pin<PB3, Input>,
        photores_pin: Pin<PE5, Input>,
        temp_pin: Pin<PB2, Input>,
    }

    #[init]
    fn init(mut ctx: init::Context) -> (Shared, Local, init::Monotonics) {
        let pac = ctx.device;

        pac.WDT.mr.modify(|_r, c| c.wddis().set_bit());
        pac.RSWDT.mr.modify(|_r, c| c.wddis().set_bit());

        rtt_init_print!();
        rprintln!("reset - companion");
        for _ in 0..5 {
            for _ in 0..1000_000 {
                cortex_m::asm::nop();
            }
            rprint!(".");
        }
        rprintln!("\ninit start");

        let clocks = Tokens::new((pac.PMC, pac.SUPC, pac.UTMI), &pac.WDT.into());
        // use internal rc oscillator for slow clock
        let slck = clocks.slck.configure_internal();
        // use external xtal as oscillator for main clock
        let mainck = clocks.mainck.configure_external_normal(16.MHz()).unwrap();
        let pck: Pck<Pck4> = clocks.pcks.pck4.configure(&mainck, 3).unwrap();
        let (hclk, mut mck) = HostClockController::new(clocks.hclk, clocks.mck)
            .configure(
                &mainck,
                &mut Efc::new(pac.EFC, VddioLevel::V3),
                HostClockConfig {
                    pres: HccPrescaler::Div1,
                    div: MckDivider::Div1,
                },
            )
            .unwrap();

        let banka = BankA::new(pac.PIOA, &mut mck, &slck, BankConfiguration::default());
        let bankb = BankB::new(pac.PIOB, &mut mck, &slck, BankConfiguration::default());
        let bankd = BankD::new(pac.PIOD, &mut mck, &slck, BankConfiguration::default());
        let banke = BankE::new(pac.PIOE, &mut mck, &slck, BankConfiguration::default());

        // serial link to the pi
        let tx = banka.pa10.into_peripheral();
        let rx = banka.pa9.into_peripheral();
        let mut uart = Uart::new_uart0(
            pac.UART0,
            (tx, rx),
            UartConfiguration::default(9_600.bps()).mode(ChannelMode::Normal),
            PeripheralClock::Other(&mut mck, &pck),
        )
        .unwrap();

        // power and signalling pins; the pi boots with us (active low)
        let pi_en = banka.pa0.into_output(false);
        // attention is idle-high, pulled low to request a status read
        let attention_pin = banka.pa1.into_output(true);
        let backlight = banka.pa2.into_output(true);
        let led = banka.pa5.into_output(false);

        let btn_lvol = banka.pa3.into_input(PullDir::PullUp);
        let btn_rvol = banka.pa4.into_input(PullDir::PullUp);
        let btn_joy = bankb.pb0.into_input(PullDir::PullUp);
        // charger status, low while the cell is charging
        let charge = bankb.pb1.into_input(PullDir::PullUp);

        // analog housekeeping
        let afec = Afec::new_afec0(pac.AFEC0, &mut mck).unwrap();
        let joy_x_pin = bankd.pd30.into_input(PullDir::PullUp);
        let joy_y_pin = banka.pa21.into_input(PullDir::PullUp);
        let vbatt_pin = bankb.pb3.into_input(PullDir::PullUp);
        let photores_pin = banke.pe5.into_input(PullDir::PullUp);
        let temp_pin = bankb.pb2.into_input(PullDir::PullUp);
        let mic = banke.pe4.into_input(PullDir::PullUp);

        let mono = DwtSystick::new(
            &mut ctx.core.DCB,
            ctx.core.DWT,
            ctx.core.SYST,
            hclk.systick_freq().to_Hz(),
        );

        uart.listen_slice(&[Event::RxReady]);
        let (tx, rx) = uart.split();

        let mut state = HouseKeeping {
            status: Status::default(),
            estatus: ExtendedStatus::default(),
            time: DateTime::default(),
            rail: PiRail::new(),
            attention: false,
            recording: false,
            audio: [0; PACKET_SIZE * 2],
            audio_index: 0,
            ready_half: None,
        };
        // cold boot; the pi clears this once it has seen it
        state.status.set_power_on(true);

        tick::spawn_after(10.millis()).unwrap();

        rprintln!("init done");

        (
            Shared {
                state,
                pi_en,
                analog: Analog { afec, mic },
            },
            Local {
                tx,
                rx,
                backlight,
                attention_pin,
                led,
                btn_lvol,
                btn_rvol,
                btn_joy,
                charge,
                joy_x_pin,
                joy_y_pin,
                vbatt_pin,
                photores_pin,
                temp_pin,
            },
            init::Monotonics(mono),
        )
    }

    #[task(binds = UART0, local = [rx], priority = 3)]
    fn uart0(ctx: uart0::Context) {
        let uart0::LocalResources { rx } = ctx.local;
        loop {
            match rx.read() {
                Ok(data) => lowprio::spawn(data).unwrap(), // panics if buffer full
                _ => break,
            }
        }
    }

    /// Frame assembly and command dispatch, one byte per message.
    #[task(
        priority = 1,
        capacity = 100,
        shared = [state, pi_en],
        local = [
            tx,
            backlight,
            index: usize = 0,
            in_buf: [u8; MAX_FRAME] = [0u8; MAX_FRAME],
            out_buf: [u8; MAX_FRAME] = [0u8; MAX_FRAME]
        ]
    )]
    fn lowprio(ctx: lowprio::Context, data: u8) {
        let lowprio::LocalResources {
            tx,
            backlight,
            index,
            in_buf,
            out_buf,
        } = ctx.local;
        in_buf[*index] = data;

        // ensure index in range
        if *index < MAX_FRAME - 1 {
            *index += 1;
        }

        // end of cobs frame
        if data != ZERO {
            return;
        }
        let frame_len = *index;
        *index = 0;

        let cmd = match deserialize_crc_cobs::<Request>(&mut in_buf[..frame_len]) {
            Ok(cmd) => cmd,
            Err(err) => {
                rprintln!("frame error {:?}", err);
                send(tx, out_buf, &Response::NotReady);
                return;
            }
        };

        let response = (ctx.shared.state, ctx.shared.pi_en).lock(|s, pi_en| match cmd {
            Request::ClearPowerOnFlag => {
                s.status.set_power_on(false);
                Response::SetOk
            }
            Request::SetBrightness { value } => {
                s.estatus.set_brightness(value);
                if value > 0 {
                    backlight.set_high().unwrap();
                } else {
                    backlight.set_low().unwrap();
                }
                Response::SetOk
            }
            Request::SetDateTime(time) => {
                s.time = time;
                Response::SetOk
            }
            Request::SetMicThreshold { value } => {
                s.estatus.set_mic_threshold(value);
                Response::SetOk
            }
            Request::GetStatus => {
                // the pi has picked the state up; release the attention line
                s.attention = false;
                Response::Status(s.status)
            }
            Request::GetExtendedStatus => Response::ExtendedStatus(s.estatus),
            Request::GetDateTime => Response::DateTime(s.time),
            Request::StartAudioRecording => {
                if !s.recording {
                    s.recording = true;
                    s.audio_index = 0;
                    s.ready_half = None;
                    audio_sample::spawn_after(125.micros()).unwrap();
                }
                Response::SetOk
            }
            Request::StopAudioRecording => {
                s.recording = false;
                Response::SetOk
            }
            Request::GetAudioPacket => match s.ready_half {
                Some(half) => {
                    let mut packet = [0u8; PACKET_SIZE];
                    packet.copy_from_slice(&s.audio[half..half + PACKET_SIZE]);
                    Response::Audio(packet)
                }
                None => Response::NotReady,
            },
            Request::PowerOff => {
                rprintln!("pi requested power off");
                pi_en.set_high().unwrap();
                s.rail.power_off();
                s.recording = false;
                Response::SetOk
            }
        });

        send(tx, out_buf, &response);
    }

    fn send(tx: &mut Tx<Uart0>, out_buf: &mut [u8; MAX_FRAME], response: &Response) {
        let to_write = serialize_crc_cobs(response, out_buf).unwrap();
        for byte in to_write {
            block!(tx.write(*byte)).unwrap();
        }
    }

    /// 10 ms housekeeping: debounce, joystick, one slow analog measurement
    /// per tick, the wall clock and the attention line.
    #[task(
        priority = 2,
        shared = [state, pi_en, analog],
        local = [
            attention_pin,
            led,
            btn_lvol,
            btn_rvol,
            btn_joy,
            charge,
            joy_x_pin,
            joy_y_pin,
            vbatt_pin,
            photores_pin,
            temp_pin,
            deb_lvol: Debounce = Debounce::new(),
            deb_rvol: Debounce = Debounce::new(),
            deb_joy: Debounce = Debounce::new(),
            chan: u8 = 0,
            centis: u16 = 0
        ]
    )]
    fn tick(ctx: tick::Context) {
        let local = ctx.local;

        let lvol = local.btn_lvol.is_low().unwrap();
        let rvol = local.btn_rvol.is_low().unwrap();
        let joy = local.btn_joy.is_low().unwrap();
        let charging = local.charge.is_low().unwrap();

        (ctx.shared.state, ctx.shared.pi_en, ctx.shared.analog).lock(|s, pi_en, analog| {
            // debounced buttons: report the first edge at once, re-sample
            // when the quiet period expires to catch short presses
            if lvol != s.status.btn_left_volume()
                && local.deb_lvol.edge()
                && s.status.update_btn_left_volume(lvol)
            {
                s.attention = true;
            }
            if local.deb_lvol.tick() && s.status.update_btn_left_volume(lvol) {
                s.attention = true;
            }

            if rvol != s.status.btn_right_volume()
                && local.deb_rvol.edge()
                && s.status.update_btn_right_volume(rvol)
            {
                s.attention = true;
            }
            if local.deb_rvol.tick() && s.status.update_btn_right_volume(rvol) {
                s.attention = true;
            }

            if joy != s.status.btn_joystick()
                && local.deb_joy.edge()
                && s.status.update_btn_joystick(joy)
            {
                s.attention = true;
            }
            if local.deb_joy.tick() && s.status.update_btn_joystick(joy) {
                s.attention = true;
            }

            s.status.set_charging(charging);

            // joystick, only meaningful while the pi rail is up
            if s.rail.is_powered() {
                let x: f32 = analog.afec.read(local.joy_x_pin).unwrap();
                let y: f32 = analog.afec.read(local.joy_y_pin).unwrap();
                if s.status.update_joy_x(to_byte(x)) {
                    s.attention = true;
                }
                if s.status.update_joy_y(to_byte(y)) {
                    s.attention = true;
                }
            }

            // one slow measurement per tick; recording owns the mic
            match *local.chan {
                0 => {
                    let v: f32 = analog.afec.read(local.vbatt_pin).unwrap();
                    // the sense pin is divider-attenuated; scale back to
                    // cell volts in 10 mV steps before classifying
                    let v_x100 = vbatt_x100(v);
                    s.estatus.set_vcc(v_x100);
                    s.estatus.set_batt(v_x100);
                    match classify(v_x100) {
                        PowerSource::Vusb => {
                            s.status.set_vusb(true);
                            s.status.set_low_battery(false);
                        }
                        PowerSource::Battery => {
                            s.status.set_vusb(false);
                            s.status.set_low_battery(false);
                        }
                        PowerSource::LowBattery => {
                            s.status.set_vusb(false);
                            s.status.set_low_battery(true);
                        }
                        PowerSource::CriticalBattery => {
                            s.status.set_vusb(false);
                            s.status.set_low_battery(true);
                            if s.rail.is_powered() {
                                rprintln!("critical battery, cutting pi power");
                                pi_en.set_high().unwrap();
                                s.rail.power_off();
                                s.attention = true;
                            }
                        }
                    }
                }
                1 => {
                    let v: f32 = analog.afec.read(local.photores_pin).unwrap();
                    if s.status.update_photores(to_byte(v)) && s.estatus.irq_photores() {
                        s.attention = true;
                    }
                }
                2 => {
                    let v: f32 = analog.afec.read(local.temp_pin).unwrap();
                    s.estatus.set_temp_x10(temp_x10_from_volts(v));
                }
                _ => {
                    if !s.recording && s.estatus.irq_mic() {
                        let v: f32 = analog.afec.read(&mut analog.mic).unwrap();
                        if to_byte(v) >= s.estatus.mic_threshold()
                            && s.status.update_mic_loud(true)
                        {
                            s.attention = true;
                        }
                    }
                }
            }
            *local.chan = (*local.chan + 1) % 4;

            // both volume buttons held for a second power the pi back up
            if s.rail.hold_tick(lvol && rvol) {
                rprintln!("power on hold, starting the pi");
                pi_en.set_low().unwrap();
                s.attention = true;
            }

            // wall clock and activity led
            *local.centis += 1;
            if *local.centis == TICK_HZ {
                *local.centis = 0;
                s.time.second_tick();
                local.led.toggle().unwrap();
            }

            if s.attention {
                local.attention_pin.set_low().unwrap();
            } else {
                local.attention_pin.set_high().unwrap();
            }
        });

        tick::spawn_after(10.millis()).unwrap();
    }

    /// 8 kHz microphone sampling while a recording runs. Each completed
    /// buffer half is offered to the pi via the attention line.
    #[task(priority = 2, shared = [state, analog])]
    fn audio_sample(ctx: audio_sample::Context) {
        let keep_going = (ctx.shared.state, ctx.shared.analog).lock(|s, analog| {
            if !s.recording {
                return false;
            }
            let v: f32 = analog.afec.read(&mut analog.mic).unwrap();
            s.audio[s.audio_index] = to_byte(v);
            s.audio_index = (s.audio_index + 1) % (PACKET_SIZE * 2);
            if s.audio_index % PACKET_SIZE == 0 {
                // the half we just left is complete
                s.ready_half = Some(if s.audio_index == 0 { PACKET_SIZE } else { 0 });
                s.attention = true;
            }
            true
        });
        if keep_going {
            audio_sample::spawn_after(125.micros()).unwrap();
        }
    }

    fn to_byte(volts: f32) -> u8 {
        let scaled = volts / 3.3 * 255.0;
        if scaled <= 0.0 {
            0
        } else if scaled >= 255.0 {
            255
        } else {
            scaled as u8
        }
    }
}
