/* Hand-maintained FlatBuffers bindings for the BPIO2 schema (schema/bpio.fbs).
 *
 * Kept in sync with the .fbs by hand instead of flatc codegen so the crate
 * builds without the schema compiler. Layout (vtable offsets, union tags,
 * field types) must match the schema exactly; the tests at the bottom pin
 * the wire image. */

#![allow(clippy::derivable_impls)]

use flatbuffers::Verifiable;

/* StatusRequest.query element values. The schema carries these as a
 * plain [uint8] vector. */
pub mod status_query {
    pub const ALL: u8 = 1;
    pub const VERSION: u8 = 2;
    pub const MODE: u8 = 3;
    pub const PSU: u8 = 4;
    pub const IO: u8 = 5;
    pub const DISK: u8 = 6;
}

/* ------------------------------------------------------------------ */
/* Union tags                                                         */
/* ------------------------------------------------------------------ */

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[repr(transparent)]
pub struct RequestPacketContents(pub u8);

#[allow(non_upper_case_globals)]
impl RequestPacketContents {
    pub const NONE: Self = Self(0);
    pub const ConfigurationRequest: Self = Self(1);
    pub const DataRequest: Self = Self(2);
    pub const StatusRequest: Self = Self(3);
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[repr(transparent)]
pub struct ResponsePacketContents(pub u8);

#[allow(non_upper_case_globals)]
impl ResponsePacketContents {
    pub const NONE: Self = Self(0);
    pub const ConfigurationResponse: Self = Self(1);
    pub const DataResponse: Self = Self(2);
    pub const StatusResponse: Self = Self(3);
}

macro_rules! union_tag_impls {
    ($name:ident) => {
        impl<'a> flatbuffers::Follow<'a> for $name {
            type Inner = Self;
            #[inline]
            unsafe fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
                let b = unsafe { flatbuffers::read_scalar_at::<u8>(buf, loc) };
                Self(b)
            }
        }

        impl flatbuffers::Push for $name {
            type Output = $name;
            #[inline]
            unsafe fn push(&self, dst: &mut [u8], _written_len: usize) {
                unsafe { flatbuffers::emplace_scalar::<u8>(dst, self.0) };
            }
        }

        impl flatbuffers::EndianScalar for $name {
            type Scalar = u8;
            #[inline]
            fn to_little_endian(self) -> u8 {
                self.0.to_le()
            }
            #[inline]
            #[allow(clippy::wrong_self_convention)]
            fn from_little_endian(v: u8) -> Self {
                Self(u8::from_le(v))
            }
        }

        impl flatbuffers::Verifiable for $name {
            #[inline]
            fn run_verifier(
                v: &mut flatbuffers::Verifier,
                pos: usize,
            ) -> Result<(), flatbuffers::InvalidFlatbuffer> {
                u8::run_verifier(v, pos)
            }
        }

        impl flatbuffers::SimpleToVerifyInSlice for $name {}
    };
}

union_tag_impls!(RequestPacketContents);
union_tag_impls!(ResponsePacketContents);

/* ------------------------------------------------------------------ */
/* ModeConfiguration                                                  */
/* ------------------------------------------------------------------ */

#[derive(Copy, Clone, PartialEq)]
pub struct ModeConfiguration<'a> {
    pub _tab: flatbuffers::Table<'a>,
}

impl<'a> flatbuffers::Follow<'a> for ModeConfiguration<'a> {
    type Inner = ModeConfiguration<'a>;
    #[inline]
    unsafe fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
        Self { _tab: unsafe { flatbuffers::Table::new(buf, loc) } }
    }
}

impl<'a> ModeConfiguration<'a> {
    pub const VT_SPEED: flatbuffers::VOffsetT = 4;
    pub const VT_DATA_BITS: flatbuffers::VOffsetT = 6;
    pub const VT_PARITY: flatbuffers::VOffsetT = 8;
    pub const VT_STOP_BITS: flatbuffers::VOffsetT = 10;
    pub const VT_FLOW_CONTROL: flatbuffers::VOffsetT = 12;
    pub const VT_SIGNAL_INVERSION: flatbuffers::VOffsetT = 14;
    pub const VT_CLOCK_STRETCH: flatbuffers::VOffsetT = 16;
    pub const VT_CLOCK_POLARITY: flatbuffers::VOffsetT = 18;
    pub const VT_CLOCK_PHASE: flatbuffers::VOffsetT = 20;
    pub const VT_CHIP_SELECT_IDLE: flatbuffers::VOffsetT = 22;
    pub const VT_SUBMODE: flatbuffers::VOffsetT = 24;
    pub const VT_TX_MODULATION: flatbuffers::VOffsetT = 26;
    pub const VT_RX_SENSOR: flatbuffers::VOffsetT = 28;

    #[inline]
    pub unsafe fn init_from_table(table: flatbuffers::Table<'a>) -> Self {
        ModeConfiguration { _tab: table }
    }

    pub fn create<'bldr: 'args, 'args: 'mut_bldr, 'mut_bldr>(
        fbb: &'mut_bldr mut flatbuffers::FlatBufferBuilder<'bldr>,
        args: &'args ModeConfigurationArgs<'args>,
    ) -> flatbuffers::WIPOffset<ModeConfiguration<'bldr>> {
        let start = fbb.start_table();
        if let Some(x) = args.speed {
            fbb.push_slot_always::<u32>(Self::VT_SPEED, x);
        }
        if let Some(x) = args.data_bits {
            fbb.push_slot_always::<u8>(Self::VT_DATA_BITS, x);
        }
        if let Some(x) = args.parity {
            fbb.push_slot_always::<bool>(Self::VT_PARITY, x);
        }
        if let Some(x) = args.stop_bits {
            fbb.push_slot_always::<u8>(Self::VT_STOP_BITS, x);
        }
        if let Some(x) = args.flow_control {
            fbb.push_slot_always::<bool>(Self::VT_FLOW_CONTROL, x);
        }
        if let Some(x) = args.signal_inversion {
            fbb.push_slot_always::<bool>(Self::VT_SIGNAL_INVERSION, x);
        }
        if let Some(x) = args.clock_stretch {
            fbb.push_slot_always::<bool>(Self::VT_CLOCK_STRETCH, x);
        }
        if let Some(x) = args.clock_polarity {
            fbb.push_slot_always::<bool>(Self::VT_CLOCK_POLARITY, x);
        }
        if let Some(x) = args.clock_phase {
            fbb.push_slot_always::<bool>(Self::VT_CLOCK_PHASE, x);
        }
        if let Some(x) = args.chip_select_idle {
            fbb.push_slot_always::<bool>(Self::VT_CHIP_SELECT_IDLE, x);
        }
        if let Some(x) = args.submode {
            fbb.push_slot_always::<flatbuffers::WIPOffset<&str>>(Self::VT_SUBMODE, x);
        }
        if let Some(x) = args.tx_modulation {
            fbb.push_slot_always::<u32>(Self::VT_TX_MODULATION, x);
        }
        if let Some(x) = args.rx_sensor {
            fbb.push_slot_always::<u32>(Self::VT_RX_SENSOR, x);
        }
        let end = fbb.end_table(start);
        flatbuffers::WIPOffset::new(end.value())
    }

    #[inline]
    pub fn speed(&self) -> u32 {
        unsafe { self._tab.get::<u32>(Self::VT_SPEED, Some(0)).unwrap() }
    }
    #[inline]
    pub fn data_bits(&self) -> u8 {
        unsafe { self._tab.get::<u8>(Self::VT_DATA_BITS, Some(0)).unwrap() }
    }
    #[inline]
    pub fn parity(&self) -> bool {
        unsafe { self._tab.get::<bool>(Self::VT_PARITY, Some(false)).unwrap() }
    }
    #[inline]
    pub fn stop_bits(&self) -> u8 {
        unsafe { self._tab.get::<u8>(Self::VT_STOP_BITS, Some(0)).unwrap() }
    }
    #[inline]
    pub fn flow_control(&self) -> bool {
        unsafe { self._tab.get::<bool>(Self::VT_FLOW_CONTROL, Some(false)).unwrap() }
    }
    #[inline]
    pub fn signal_inversion(&self) -> bool {
        unsafe { self._tab.get::<bool>(Self::VT_SIGNAL_INVERSION, Some(false)).unwrap() }
    }
    #[inline]
    pub fn clock_stretch(&self) -> bool {
        unsafe { self._tab.get::<bool>(Self::VT_CLOCK_STRETCH, Some(false)).unwrap() }
    }
    #[inline]
    pub fn clock_polarity(&self) -> bool {
        unsafe { self._tab.get::<bool>(Self::VT_CLOCK_POLARITY, Some(false)).unwrap() }
    }
    #[inline]
    pub fn clock_phase(&self) -> bool {
        unsafe { self._tab.get::<bool>(Self::VT_CLOCK_PHASE, Some(false)).unwrap() }
    }
    #[inline]
    pub fn chip_select_idle(&self) -> bool {
        unsafe { self._tab.get::<bool>(Self::VT_CHIP_SELECT_IDLE, Some(false)).unwrap() }
    }
    #[inline]
    pub fn submode(&self) -> Option<&'a str> {
        unsafe { self._tab.get::<flatbuffers::ForwardsUOffset<&str>>(Self::VT_SUBMODE, None) }
    }
    #[inline]
    pub fn tx_modulation(&self) -> u32 {
        unsafe { self._tab.get::<u32>(Self::VT_TX_MODULATION, Some(0)).unwrap() }
    }
    #[inline]
    pub fn rx_sensor(&self) -> u32 {
        unsafe { self._tab.get::<u32>(Self::VT_RX_SENSOR, Some(0)).unwrap() }
    }
}

impl Verifiable for ModeConfiguration<'_> {
    #[inline]
    fn run_verifier(
        v: &mut flatbuffers::Verifier,
        pos: usize,
    ) -> Result<(), flatbuffers::InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<u32>("speed", Self::VT_SPEED, false)?
            .visit_field::<u8>("data_bits", Self::VT_DATA_BITS, false)?
            .visit_field::<bool>("parity", Self::VT_PARITY, false)?
            .visit_field::<u8>("stop_bits", Self::VT_STOP_BITS, false)?
            .visit_field::<bool>("flow_control", Self::VT_FLOW_CONTROL, false)?
            .visit_field::<bool>("signal_inversion", Self::VT_SIGNAL_INVERSION, false)?
            .visit_field::<bool>("clock_stretch", Self::VT_CLOCK_STRETCH, false)?
            .visit_field::<bool>("clock_polarity", Self::VT_CLOCK_POLARITY, false)?
            .visit_field::<bool>("clock_phase", Self::VT_CLOCK_PHASE, false)?
            .visit_field::<bool>("chip_select_idle", Self::VT_CHIP_SELECT_IDLE, false)?
            .visit_field::<flatbuffers::ForwardsUOffset<&str>>("submode", Self::VT_SUBMODE, false)?
            .visit_field::<u32>("tx_modulation", Self::VT_TX_MODULATION, false)?
            .visit_field::<u32>("rx_sensor", Self::VT_RX_SENSOR, false)?
            .finish();
        Ok(())
    }
}

#[derive(Default)]
pub struct ModeConfigurationArgs<'a> {
    pub speed: Option<u32>,
    pub data_bits: Option<u8>,
    pub parity: Option<bool>,
    pub stop_bits: Option<u8>,
    pub flow_control: Option<bool>,
    pub signal_inversion: Option<bool>,
    pub clock_stretch: Option<bool>,
    pub clock_polarity: Option<bool>,
    pub clock_phase: Option<bool>,
    pub chip_select_idle: Option<bool>,
    pub submode: Option<flatbuffers::WIPOffset<&'a str>>,
    pub tx_modulation: Option<u32>,
    pub rx_sensor: Option<u32>,
}

/* ------------------------------------------------------------------ */
/* ConfigurationRequest / ConfigurationResponse                       */
/* ------------------------------------------------------------------ */

#[derive(Copy, Clone, PartialEq)]
pub struct ConfigurationRequest<'a> {
    pub _tab: flatbuffers::Table<'a>,
}

impl<'a> flatbuffers::Follow<'a> for ConfigurationRequest<'a> {
    type Inner = ConfigurationRequest<'a>;
    #[inline]
    unsafe fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
        Self { _tab: unsafe { flatbuffers::Table::new(buf, loc) } }
    }
}

impl<'a> ConfigurationRequest<'a> {
    pub const VT_MODE: flatbuffers::VOffsetT = 4;
    pub const VT_MODE_CONFIGURATION: flatbuffers::VOffsetT = 6;
    pub const VT_MODE_BITORDER_MSB: flatbuffers::VOffsetT = 8;
    pub const VT_MODE_BITORDER_LSB: flatbuffers::VOffsetT = 10;
    pub const VT_PSU_DISABLE: flatbuffers::VOffsetT = 12;
    pub const VT_PSU_ENABLE: flatbuffers::VOffsetT = 14;
    pub const VT_PSU_SET_MV: flatbuffers::VOffsetT = 16;
    pub const VT_PSU_SET_MA: flatbuffers::VOffsetT = 18;
    pub const VT_PULLUP_DISABLE: flatbuffers::VOffsetT = 20;
    pub const VT_PULLUP_ENABLE: flatbuffers::VOffsetT = 22;
    pub const VT_IO_DIRECTION_MASK: flatbuffers::VOffsetT = 24;
    pub const VT_IO_DIRECTION: flatbuffers::VOffsetT = 26;
    pub const VT_IO_VALUE_MASK: flatbuffers::VOffsetT = 28;
    pub const VT_IO_VALUE: flatbuffers::VOffsetT = 30;
    pub const VT_LED_RESUME: flatbuffers::VOffsetT = 32;
    pub const VT_LED_COLOR: flatbuffers::VOffsetT = 34;
    pub const VT_PRINT_STRING: flatbuffers::VOffsetT = 36;
    pub const VT_HARDWARE_BOOTLOADER: flatbuffers::VOffsetT = 38;
    pub const VT_HARDWARE_RESET: flatbuffers::VOffsetT = 40;
    pub const VT_HARDWARE_SELFTEST: flatbuffers::VOffsetT = 42;

    #[inline]
    pub unsafe fn init_from_table(table: flatbuffers::Table<'a>) -> Self {
        ConfigurationRequest { _tab: table }
    }

    pub fn create<'bldr: 'args, 'args: 'mut_bldr, 'mut_bldr>(
        fbb: &'mut_bldr mut flatbuffers::FlatBufferBuilder<'bldr>,
        args: &'args ConfigurationRequestArgs<'args>,
    ) -> flatbuffers::WIPOffset<ConfigurationRequest<'bldr>> {
        let start = fbb.start_table();
        if let Some(x) = args.mode {
            fbb.push_slot_always::<flatbuffers::WIPOffset<&str>>(Self::VT_MODE, x);
        }
        if let Some(x) = args.mode_configuration {
            fbb.push_slot_always::<flatbuffers::WIPOffset<ModeConfiguration>>(
                Self::VT_MODE_CONFIGURATION,
                x,
            );
        }
        if let Some(x) = args.mode_bitorder_msb {
            fbb.push_slot_always::<bool>(Self::VT_MODE_BITORDER_MSB, x);
        }
        if let Some(x) = args.mode_bitorder_lsb {
            fbb.push_slot_always::<bool>(Self::VT_MODE_BITORDER_LSB, x);
        }
        if let Some(x) = args.psu_disable {
            fbb.push_slot_always::<bool>(Self::VT_PSU_DISABLE, x);
        }
        if let Some(x) = args.psu_enable {
            fbb.push_slot_always::<bool>(Self::VT_PSU_ENABLE, x);
        }
        if let Some(x) = args.psu_set_mv {
            fbb.push_slot_always::<u32>(Self::VT_PSU_SET_MV, x);
        }
        if let Some(x) = args.psu_set_ma {
            fbb.push_slot_always::<u32>(Self::VT_PSU_SET_MA, x);
        }
        if let Some(x) = args.pullup_disable {
            fbb.push_slot_always::<bool>(Self::VT_PULLUP_DISABLE, x);
        }
        if let Some(x) = args.pullup_enable {
            fbb.push_slot_always::<bool>(Self::VT_PULLUP_ENABLE, x);
        }
        if let Some(x) = args.io_direction_mask {
            fbb.push_slot_always::<u8>(Self::VT_IO_DIRECTION_MASK, x);
        }
        if let Some(x) = args.io_direction {
            fbb.push_slot_always::<u8>(Self::VT_IO_DIRECTION, x);
        }
        if let Some(x) = args.io_value_mask {
            fbb.push_slot_always::<u8>(Self::VT_IO_VALUE_MASK, x);
        }
        if let Some(x) = args.io_value {
            fbb.push_slot_always::<u8>(Self::VT_IO_VALUE, x);
        }
        if let Some(x) = args.led_resume {
            fbb.push_slot_always::<bool>(Self::VT_LED_RESUME, x);
        }
        if let Some(x) = args.led_color {
            fbb.push_slot_always::<flatbuffers::WIPOffset<_>>(Self::VT_LED_COLOR, x);
        }
        if let Some(x) = args.print_string {
            fbb.push_slot_always::<flatbuffers::WIPOffset<&str>>(Self::VT_PRINT_STRING, x);
        }
        if let Some(x) = args.hardware_bootloader {
            fbb.push_slot_always::<bool>(Self::VT_HARDWARE_BOOTLOADER, x);
        }
        if let Some(x) = args.hardware_reset {
            fbb.push_slot_always::<bool>(Self::VT_HARDWARE_RESET, x);
        }
        if let Some(x) = args.hardware_selftest {
            fbb.push_slot_always::<bool>(Self::VT_HARDWARE_SELFTEST, x);
        }
        let end = fbb.end_table(start);
        flatbuffers::WIPOffset::new(end.value())
    }

    #[inline]
    pub fn mode(&self) -> Option<&'a str> {
        unsafe { self._tab.get::<flatbuffers::ForwardsUOffset<&str>>(Self::VT_MODE, None) }
    }
    #[inline]
    pub fn mode_configuration(&self) -> Option<ModeConfiguration<'a>> {
        unsafe {
            self._tab.get::<flatbuffers::ForwardsUOffset<ModeConfiguration>>(
                Self::VT_MODE_CONFIGURATION,
                None,
            )
        }
    }
    #[inline]
    pub fn mode_bitorder_msb(&self) -> bool {
        unsafe { self._tab.get::<bool>(Self::VT_MODE_BITORDER_MSB, Some(false)).unwrap() }
    }
    #[inline]
    pub fn psu_enable(&self) -> bool {
        unsafe { self._tab.get::<bool>(Self::VT_PSU_ENABLE, Some(false)).unwrap() }
    }
    #[inline]
    pub fn psu_disable(&self) -> bool {
        unsafe { self._tab.get::<bool>(Self::VT_PSU_DISABLE, Some(false)).unwrap() }
    }
    #[inline]
    pub fn psu_set_mv(&self) -> u32 {
        unsafe { self._tab.get::<u32>(Self::VT_PSU_SET_MV, Some(0)).unwrap() }
    }
    #[inline]
    pub fn psu_set_ma(&self) -> u32 {
        unsafe { self._tab.get::<u32>(Self::VT_PSU_SET_MA, Some(0)).unwrap() }
    }
    #[inline]
    pub fn pullup_enable(&self) -> bool {
        unsafe { self._tab.get::<bool>(Self::VT_PULLUP_ENABLE, Some(false)).unwrap() }
    }
    #[inline]
    pub fn pullup_disable(&self) -> bool {
        unsafe { self._tab.get::<bool>(Self::VT_PULLUP_DISABLE, Some(false)).unwrap() }
    }
    #[inline]
    pub fn io_direction_mask(&self) -> u8 {
        unsafe { self._tab.get::<u8>(Self::VT_IO_DIRECTION_MASK, Some(0)).unwrap() }
    }
    #[inline]
    pub fn io_value_mask(&self) -> u8 {
        unsafe { self._tab.get::<u8>(Self::VT_IO_VALUE_MASK, Some(0)).unwrap() }
    }
    #[inline]
    pub fn hardware_reset(&self) -> bool {
        unsafe { self._tab.get::<bool>(Self::VT_HARDWARE_RESET, Some(false)).unwrap() }
    }
}

impl Verifiable for ConfigurationRequest<'_> {
    #[inline]
    fn run_verifier(
        v: &mut flatbuffers::Verifier,
        pos: usize,
    ) -> Result<(), flatbuffers::InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<flatbuffers::ForwardsUOffset<&str>>("mode", Self::VT_MODE, false)?
            .visit_field::<flatbuffers::ForwardsUOffset<ModeConfiguration>>(
                "mode_configuration",
                Self::VT_MODE_CONFIGURATION,
                false,
            )?
            .visit_field::<bool>("mode_bitorder_msb", Self::VT_MODE_BITORDER_MSB, false)?
            .visit_field::<bool>("mode_bitorder_lsb", Self::VT_MODE_BITORDER_LSB, false)?
            .visit_field::<bool>("psu_disable", Self::VT_PSU_DISABLE, false)?
            .visit_field::<bool>("psu_enable", Self::VT_PSU_ENABLE, false)?
            .visit_field::<u32>("psu_set_mv", Self::VT_PSU_SET_MV, false)?
            .visit_field::<u32>("psu_set_ma", Self::VT_PSU_SET_MA, false)?
            .visit_field::<bool>("pullup_disable", Self::VT_PULLUP_DISABLE, false)?
            .visit_field::<bool>("pullup_enable", Self::VT_PULLUP_ENABLE, false)?
            .visit_field::<u8>("io_direction_mask", Self::VT_IO_DIRECTION_MASK, false)?
            .visit_field::<u8>("io_direction", Self::VT_IO_DIRECTION, false)?
            .visit_field::<u8>("io_value_mask", Self::VT_IO_VALUE_MASK, false)?
            .visit_field::<u8>("io_value", Self::VT_IO_VALUE, false)?
            .visit_field::<bool>("led_resume", Self::VT_LED_RESUME, false)?
            .visit_field::<flatbuffers::ForwardsUOffset<flatbuffers::Vector<'_, u32>>>(
                "led_color",
                Self::VT_LED_COLOR,
                false,
            )?
            .visit_field::<flatbuffers::ForwardsUOffset<&str>>(
                "print_string",
                Self::VT_PRINT_STRING,
                false,
            )?
            .visit_field::<bool>("hardware_bootloader", Self::VT_HARDWARE_BOOTLOADER, false)?
            .visit_field::<bool>("hardware_reset", Self::VT_HARDWARE_RESET, false)?
            .visit_field::<bool>("hardware_selftest", Self::VT_HARDWARE_SELFTEST, false)?
            .finish();
        Ok(())
    }
}

#[derive(Default)]
pub struct ConfigurationRequestArgs<'a> {
    pub mode: Option<flatbuffers::WIPOffset<&'a str>>,
    pub mode_configuration: Option<flatbuffers::WIPOffset<ModeConfiguration<'a>>>,
    pub mode_bitorder_msb: Option<bool>,
    pub mode_bitorder_lsb: Option<bool>,
    pub psu_disable: Option<bool>,
    pub psu_enable: Option<bool>,
    pub psu_set_mv: Option<u32>,
    pub psu_set_ma: Option<u32>,
    pub pullup_disable: Option<bool>,
    pub pullup_enable: Option<bool>,
    pub io_direction_mask: Option<u8>,
    pub io_direction: Option<u8>,
    pub io_value_mask: Option<u8>,
    pub io_value: Option<u8>,
    pub led_resume: Option<bool>,
    pub led_color: Option<flatbuffers::WIPOffset<flatbuffers::Vector<'a, u32>>>,
    pub print_string: Option<flatbuffers::WIPOffset<&'a str>>,
    pub hardware_bootloader: Option<bool>,
    pub hardware_reset: Option<bool>,
    pub hardware_selftest: Option<bool>,
}

#[derive(Copy, Clone, PartialEq)]
pub struct ConfigurationResponse<'a> {
    pub _tab: flatbuffers::Table<'a>,
}

impl<'a> flatbuffers::Follow<'a> for ConfigurationResponse<'a> {
    type Inner = ConfigurationResponse<'a>;
    #[inline]
    unsafe fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
        Self { _tab: unsafe { flatbuffers::Table::new(buf, loc) } }
    }
}

impl<'a> ConfigurationResponse<'a> {
    pub const VT_ERROR: flatbuffers::VOffsetT = 4;

    #[inline]
    pub unsafe fn init_from_table(table: flatbuffers::Table<'a>) -> Self {
        ConfigurationResponse { _tab: table }
    }

    pub fn create<'bldr: 'args, 'args: 'mut_bldr, 'mut_bldr>(
        fbb: &'mut_bldr mut flatbuffers::FlatBufferBuilder<'bldr>,
        args: &'args ConfigurationResponseArgs<'args>,
    ) -> flatbuffers::WIPOffset<ConfigurationResponse<'bldr>> {
        let start = fbb.start_table();
        if let Some(x) = args.error {
            fbb.push_slot_always::<flatbuffers::WIPOffset<&str>>(Self::VT_ERROR, x);
        }
        let end = fbb.end_table(start);
        flatbuffers::WIPOffset::new(end.value())
    }

    #[inline]
    pub fn error(&self) -> Option<&'a str> {
        unsafe { self._tab.get::<flatbuffers::ForwardsUOffset<&str>>(Self::VT_ERROR, None) }
    }
}

impl Verifiable for ConfigurationResponse<'_> {
    #[inline]
    fn run_verifier(
        v: &mut flatbuffers::Verifier,
        pos: usize,
    ) -> Result<(), flatbuffers::InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<flatbuffers::ForwardsUOffset<&str>>("error", Self::VT_ERROR, false)?
            .finish();
        Ok(())
    }
}

#[derive(Default)]
pub struct ConfigurationResponseArgs<'a> {
    pub error: Option<flatbuffers::WIPOffset<&'a str>>,
}

/* ------------------------------------------------------------------ */
/* DataRequest / DataResponse                                         */
/* ------------------------------------------------------------------ */

#[derive(Copy, Clone, PartialEq)]
pub struct DataRequest<'a> {
    pub _tab: flatbuffers::Table<'a>,
}

impl<'a> flatbuffers::Follow<'a> for DataRequest<'a> {
    type Inner = DataRequest<'a>;
    #[inline]
    unsafe fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
        Self { _tab: unsafe { flatbuffers::Table::new(buf, loc) } }
    }
}

impl<'a> DataRequest<'a> {
    pub const VT_START_MAIN: flatbuffers::VOffsetT = 4;
    pub const VT_START_ALT: flatbuffers::VOffsetT = 6;
    pub const VT_DATA_WRITE: flatbuffers::VOffsetT = 8;
    pub const VT_BYTES_READ: flatbuffers::VOffsetT = 10;
    pub const VT_STOP_MAIN: flatbuffers::VOffsetT = 12;
    pub const VT_STOP_ALT: flatbuffers::VOffsetT = 14;

    #[inline]
    pub unsafe fn init_from_table(table: flatbuffers::Table<'a>) -> Self {
        DataRequest { _tab: table }
    }

    pub fn create<'bldr: 'args, 'args: 'mut_bldr, 'mut_bldr>(
        fbb: &'mut_bldr mut flatbuffers::FlatBufferBuilder<'bldr>,
        args: &'args DataRequestArgs<'args>,
    ) -> flatbuffers::WIPOffset<DataRequest<'bldr>> {
        let start = fbb.start_table();
        if let Some(x) = args.start_main {
            fbb.push_slot_always::<bool>(Self::VT_START_MAIN, x);
        }
        if let Some(x) = args.start_alt {
            fbb.push_slot_always::<bool>(Self::VT_START_ALT, x);
        }
        if let Some(x) = args.data_write {
            fbb.push_slot_always::<flatbuffers::WIPOffset<_>>(Self::VT_DATA_WRITE, x);
        }
        if let Some(x) = args.bytes_read {
            fbb.push_slot_always::<u16>(Self::VT_BYTES_READ, x);
        }
        if let Some(x) = args.stop_main {
            fbb.push_slot_always::<bool>(Self::VT_STOP_MAIN, x);
        }
        if let Some(x) = args.stop_alt {
            fbb.push_slot_always::<bool>(Self::VT_STOP_ALT, x);
        }
        let end = fbb.end_table(start);
        flatbuffers::WIPOffset::new(end.value())
    }

    #[inline]
    pub fn start_main(&self) -> bool {
        unsafe { self._tab.get::<bool>(Self::VT_START_MAIN, Some(false)).unwrap() }
    }
    #[inline]
    pub fn start_alt(&self) -> bool {
        unsafe { self._tab.get::<bool>(Self::VT_START_ALT, Some(false)).unwrap() }
    }
    #[inline]
    pub fn data_write(&self) -> Option<flatbuffers::Vector<'a, u8>> {
        unsafe {
            self._tab
                .get::<flatbuffers::ForwardsUOffset<flatbuffers::Vector<'a, u8>>>(
                    Self::VT_DATA_WRITE,
                    None,
                )
        }
    }
    #[inline]
    pub fn bytes_read(&self) -> u16 {
        unsafe { self._tab.get::<u16>(Self::VT_BYTES_READ, Some(0)).unwrap() }
    }
    #[inline]
    pub fn stop_main(&self) -> bool {
        unsafe { self._tab.get::<bool>(Self::VT_STOP_MAIN, Some(false)).unwrap() }
    }
    #[inline]
    pub fn stop_alt(&self) -> bool {
        unsafe { self._tab.get::<bool>(Self::VT_STOP_ALT, Some(false)).unwrap() }
    }
}

impl Verifiable for DataRequest<'_> {
    #[inline]
    fn run_verifier(
        v: &mut flatbuffers::Verifier,
        pos: usize,
    ) -> Result<(), flatbuffers::InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<bool>("start_main", Self::VT_START_MAIN, false)?
            .visit_field::<bool>("start_alt", Self::VT_START_ALT, false)?
            .visit_field::<flatbuffers::ForwardsUOffset<flatbuffers::Vector<'_, u8>>>(
                "data_write",
                Self::VT_DATA_WRITE,
                false,
            )?
            .visit_field::<u16>("bytes_read", Self::VT_BYTES_READ, false)?
            .visit_field::<bool>("stop_main", Self::VT_STOP_MAIN, false)?
            .visit_field::<bool>("stop_alt", Self::VT_STOP_ALT, false)?
            .finish();
        Ok(())
    }
}

#[derive(Default)]
pub struct DataRequestArgs<'a> {
    pub start_main: Option<bool>,
    pub start_alt: Option<bool>,
    pub data_write: Option<flatbuffers::WIPOffset<flatbuffers::Vector<'a, u8>>>,
    pub bytes_read: Option<u16>,
    pub stop_main: Option<bool>,
    pub stop_alt: Option<bool>,
}

#[derive(Copy, Clone, PartialEq)]
pub struct DataResponse<'a> {
    pub _tab: flatbuffers::Table<'a>,
}

impl<'a> flatbuffers::Follow<'a> for DataResponse<'a> {
    type Inner = DataResponse<'a>;
    #[inline]
    unsafe fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
        Self { _tab: unsafe { flatbuffers::Table::new(buf, loc) } }
    }
}

impl<'a> DataResponse<'a> {
    pub const VT_ERROR: flatbuffers::VOffsetT = 4;
    pub const VT_DATA_READ: flatbuffers::VOffsetT = 6;

    #[inline]
    pub unsafe fn init_from_table(table: flatbuffers::Table<'a>) -> Self {
        DataResponse { _tab: table }
    }

    pub fn create<'bldr: 'args, 'args: 'mut_bldr, 'mut_bldr>(
        fbb: &'mut_bldr mut flatbuffers::FlatBufferBuilder<'bldr>,
        args: &'args DataResponseArgs<'args>,
    ) -> flatbuffers::WIPOffset<DataResponse<'bldr>> {
        let start = fbb.start_table();
        if let Some(x) = args.error {
            fbb.push_slot_always::<flatbuffers::WIPOffset<&str>>(Self::VT_ERROR, x);
        }
        if let Some(x) = args.data_read {
            fbb.push_slot_always::<flatbuffers::WIPOffset<_>>(Self::VT_DATA_READ, x);
        }
        let end = fbb.end_table(start);
        flatbuffers::WIPOffset::new(end.value())
    }

    #[inline]
    pub fn error(&self) -> Option<&'a str> {
        unsafe { self._tab.get::<flatbuffers::ForwardsUOffset<&str>>(Self::VT_ERROR, None) }
    }
    #[inline]
    pub fn data_read(&self) -> Option<flatbuffers::Vector<'a, u8>> {
        unsafe {
            self._tab
                .get::<flatbuffers::ForwardsUOffset<flatbuffers::Vector<'a, u8>>>(
                    Self::VT_DATA_READ,
                    None,
                )
        }
    }
}

impl Verifiable for DataResponse<'_> {
    #[inline]
    fn run_verifier(
        v: &mut flatbuffers::Verifier,
        pos: usize,
    ) -> Result<(), flatbuffers::InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<flatbuffers::ForwardsUOffset<&str>>("error", Self::VT_ERROR, false)?
            .visit_field::<flatbuffers::ForwardsUOffset<flatbuffers::Vector<'_, u8>>>(
                "data_read",
                Self::VT_DATA_READ,
                false,
            )?
            .finish();
        Ok(())
    }
}

#[derive(Default)]
pub struct DataResponseArgs<'a> {
    pub error: Option<flatbuffers::WIPOffset<&'a str>>,
    pub data_read: Option<flatbuffers::WIPOffset<flatbuffers::Vector<'a, u8>>>,
}

/* ------------------------------------------------------------------ */
/* StatusRequest / StatusResponse                                     */
/* ------------------------------------------------------------------ */

#[derive(Copy, Clone, PartialEq)]
pub struct StatusRequest<'a> {
    pub _tab: flatbuffers::Table<'a>,
}

impl<'a> flatbuffers::Follow<'a> for StatusRequest<'a> {
    type Inner = StatusRequest<'a>;
    #[inline]
    unsafe fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
        Self { _tab: unsafe { flatbuffers::Table::new(buf, loc) } }
    }
}

impl<'a> StatusRequest<'a> {
    pub const VT_QUERY: flatbuffers::VOffsetT = 4;

    #[inline]
    pub unsafe fn init_from_table(table: flatbuffers::Table<'a>) -> Self {
        StatusRequest { _tab: table }
    }

    pub fn create<'bldr: 'args, 'args: 'mut_bldr, 'mut_bldr>(
        fbb: &'mut_bldr mut flatbuffers::FlatBufferBuilder<'bldr>,
        args: &'args StatusRequestArgs<'args>,
    ) -> flatbuffers::WIPOffset<StatusRequest<'bldr>> {
        let start = fbb.start_table();
        if let Some(x) = args.query {
            fbb.push_slot_always::<flatbuffers::WIPOffset<_>>(Self::VT_QUERY, x);
        }
        let end = fbb.end_table(start);
        flatbuffers::WIPOffset::new(end.value())
    }

    #[inline]
    pub fn query(&self) -> Option<flatbuffers::Vector<'a, u8>> {
        unsafe {
            self._tab
                .get::<flatbuffers::ForwardsUOffset<flatbuffers::Vector<'a, u8>>>(Self::VT_QUERY, None)
        }
    }
}

impl Verifiable for StatusRequest<'_> {
    #[inline]
    fn run_verifier(
        v: &mut flatbuffers::Verifier,
        pos: usize,
    ) -> Result<(), flatbuffers::InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<flatbuffers::ForwardsUOffset<flatbuffers::Vector<'_, u8>>>(
                "query",
                Self::VT_QUERY,
                false,
            )?
            .finish();
        Ok(())
    }
}

#[derive(Default)]
pub struct StatusRequestArgs<'a> {
    pub query: Option<flatbuffers::WIPOffset<flatbuffers::Vector<'a, u8>>>,
}

#[derive(Copy, Clone, PartialEq)]
pub struct StatusResponse<'a> {
    pub _tab: flatbuffers::Table<'a>,
}

impl<'a> flatbuffers::Follow<'a> for StatusResponse<'a> {
    type Inner = StatusResponse<'a>;
    #[inline]
    unsafe fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
        Self { _tab: unsafe { flatbuffers::Table::new(buf, loc) } }
    }
}

impl<'a> StatusResponse<'a> {
    pub const VT_ERROR: flatbuffers::VOffsetT = 4;
    pub const VT_VERSION_FLATBUFFERS_MAJOR: flatbuffers::VOffsetT = 6;
    pub const VT_VERSION_FLATBUFFERS_MINOR: flatbuffers::VOffsetT = 8;
    pub const VT_VERSION_HARDWARE_MAJOR: flatbuffers::VOffsetT = 10;
    pub const VT_VERSION_HARDWARE_MINOR: flatbuffers::VOffsetT = 12;
    pub const VT_VERSION_FIRMWARE_MAJOR: flatbuffers::VOffsetT = 14;
    pub const VT_VERSION_FIRMWARE_MINOR: flatbuffers::VOffsetT = 16;
    pub const VT_VERSION_FIRMWARE_GIT_HASH: flatbuffers::VOffsetT = 18;
    pub const VT_VERSION_FIRMWARE_DATE: flatbuffers::VOffsetT = 20;
    pub const VT_MODES_AVAILABLE: flatbuffers::VOffsetT = 22;
    pub const VT_MODE_CURRENT: flatbuffers::VOffsetT = 24;
    pub const VT_MODE_PIN_LABELS: flatbuffers::VOffsetT = 26;
    pub const VT_MODE_BITORDER_MSB: flatbuffers::VOffsetT = 28;
    pub const VT_MODE_MAX_PACKET_SIZE: flatbuffers::VOffsetT = 30;
    pub const VT_MODE_MAX_WRITE: flatbuffers::VOffsetT = 32;
    pub const VT_MODE_MAX_READ: flatbuffers::VOffsetT = 34;
    pub const VT_PSU_ENABLED: flatbuffers::VOffsetT = 36;
    pub const VT_PSU_SET_MV: flatbuffers::VOffsetT = 38;
    pub const VT_PSU_SET_MA: flatbuffers::VOffsetT = 40;
    pub const VT_PSU_MEASURED_MV: flatbuffers::VOffsetT = 42;
    pub const VT_PSU_MEASURED_MA: flatbuffers::VOffsetT = 44;
    pub const VT_PSU_CURRENT_ERROR: flatbuffers::VOffsetT = 46;
    pub const VT_PULLUP_ENABLED: flatbuffers::VOffsetT = 48;
    pub const VT_ADC_MV: flatbuffers::VOffsetT = 50;
    pub const VT_IO_DIRECTION: flatbuffers::VOffsetT = 52;
    pub const VT_IO_VALUE: flatbuffers::VOffsetT = 54;
    pub const VT_DISK_SIZE_MB: flatbuffers::VOffsetT = 56;
    pub const VT_DISK_USED_MB: flatbuffers::VOffsetT = 58;
    pub const VT_LED_COUNT: flatbuffers::VOffsetT = 60;

    #[inline]
    pub unsafe fn init_from_table(table: flatbuffers::Table<'a>) -> Self {
        StatusResponse { _tab: table }
    }

    pub fn create<'bldr: 'args, 'args: 'mut_bldr, 'mut_bldr>(
        fbb: &'mut_bldr mut flatbuffers::FlatBufferBuilder<'bldr>,
        args: &'args StatusResponseArgs<'args>,
    ) -> flatbuffers::WIPOffset<StatusResponse<'bldr>> {
        let start = fbb.start_table();
        if let Some(x) = args.error {
            fbb.push_slot_always::<flatbuffers::WIPOffset<&str>>(Self::VT_ERROR, x);
        }
        fbb.push_slot::<u16>(Self::VT_VERSION_FLATBUFFERS_MAJOR, args.version_flatbuffers_major, 0);
        fbb.push_slot::<u16>(Self::VT_VERSION_FLATBUFFERS_MINOR, args.version_flatbuffers_minor, 0);
        fbb.push_slot::<u16>(Self::VT_VERSION_HARDWARE_MAJOR, args.version_hardware_major, 0);
        fbb.push_slot::<u16>(Self::VT_VERSION_HARDWARE_MINOR, args.version_hardware_minor, 0);
        fbb.push_slot::<u16>(Self::VT_VERSION_FIRMWARE_MAJOR, args.version_firmware_major, 0);
        fbb.push_slot::<u16>(Self::VT_VERSION_FIRMWARE_MINOR, args.version_firmware_minor, 0);
        if let Some(x) = args.version_firmware_git_hash {
            fbb.push_slot_always::<flatbuffers::WIPOffset<&str>>(Self::VT_VERSION_FIRMWARE_GIT_HASH, x);
        }
        if let Some(x) = args.version_firmware_date {
            fbb.push_slot_always::<flatbuffers::WIPOffset<&str>>(Self::VT_VERSION_FIRMWARE_DATE, x);
        }
        if let Some(x) = args.modes_available {
            fbb.push_slot_always::<flatbuffers::WIPOffset<_>>(Self::VT_MODES_AVAILABLE, x);
        }
        if let Some(x) = args.mode_current {
            fbb.push_slot_always::<flatbuffers::WIPOffset<&str>>(Self::VT_MODE_CURRENT, x);
        }
        if let Some(x) = args.mode_pin_labels {
            fbb.push_slot_always::<flatbuffers::WIPOffset<_>>(Self::VT_MODE_PIN_LABELS, x);
        }
        fbb.push_slot::<bool>(Self::VT_MODE_BITORDER_MSB, args.mode_bitorder_msb, false);
        fbb.push_slot::<u16>(Self::VT_MODE_MAX_PACKET_SIZE, args.mode_max_packet_size, 0);
        fbb.push_slot::<u16>(Self::VT_MODE_MAX_WRITE, args.mode_max_write, 0);
        fbb.push_slot::<u16>(Self::VT_MODE_MAX_READ, args.mode_max_read, 0);
        fbb.push_slot::<bool>(Self::VT_PSU_ENABLED, args.psu_enabled, false);
        fbb.push_slot::<u32>(Self::VT_PSU_SET_MV, args.psu_set_mv, 0);
        fbb.push_slot::<u32>(Self::VT_PSU_SET_MA, args.psu_set_ma, 0);
        fbb.push_slot::<u32>(Self::VT_PSU_MEASURED_MV, args.psu_measured_mv, 0);
        fbb.push_slot::<u32>(Self::VT_PSU_MEASURED_MA, args.psu_measured_ma, 0);
        fbb.push_slot::<bool>(Self::VT_PSU_CURRENT_ERROR, args.psu_current_error, false);
        fbb.push_slot::<bool>(Self::VT_PULLUP_ENABLED, args.pullup_enabled, false);
        if let Some(x) = args.adc_mv {
            fbb.push_slot_always::<flatbuffers::WIPOffset<_>>(Self::VT_ADC_MV, x);
        }
        fbb.push_slot::<u8>(Self::VT_IO_DIRECTION, args.io_direction, 0);
        fbb.push_slot::<u8>(Self::VT_IO_VALUE, args.io_value, 0);
        fbb.push_slot::<u32>(Self::VT_DISK_SIZE_MB, args.disk_size_mb, 0);
        fbb.push_slot::<u32>(Self::VT_DISK_USED_MB, args.disk_used_mb, 0);
        fbb.push_slot::<u8>(Self::VT_LED_COUNT, args.led_count, 0);
        let end = fbb.end_table(start);
        flatbuffers::WIPOffset::new(end.value())
    }

    #[inline]
    pub fn error(&self) -> Option<&'a str> {
        unsafe { self._tab.get::<flatbuffers::ForwardsUOffset<&str>>(Self::VT_ERROR, None) }
    }
    #[inline]
    pub fn version_flatbuffers_major(&self) -> u16 {
        unsafe { self._tab.get::<u16>(Self::VT_VERSION_FLATBUFFERS_MAJOR, Some(0)).unwrap() }
    }
    #[inline]
    pub fn version_flatbuffers_minor(&self) -> u16 {
        unsafe { self._tab.get::<u16>(Self::VT_VERSION_FLATBUFFERS_MINOR, Some(0)).unwrap() }
    }
    #[inline]
    pub fn version_hardware_major(&self) -> u16 {
        unsafe { self._tab.get::<u16>(Self::VT_VERSION_HARDWARE_MAJOR, Some(0)).unwrap() }
    }
    #[inline]
    pub fn version_hardware_minor(&self) -> u16 {
        unsafe { self._tab.get::<u16>(Self::VT_VERSION_HARDWARE_MINOR, Some(0)).unwrap() }
    }
    #[inline]
    pub fn version_firmware_major(&self) -> u16 {
        unsafe { self._tab.get::<u16>(Self::VT_VERSION_FIRMWARE_MAJOR, Some(0)).unwrap() }
    }
    #[inline]
    pub fn version_firmware_minor(&self) -> u16 {
        unsafe { self._tab.get::<u16>(Self::VT_VERSION_FIRMWARE_MINOR, Some(0)).unwrap() }
    }
    #[inline]
    pub fn version_firmware_git_hash(&self) -> Option<&'a str> {
        unsafe {
            self._tab
                .get::<flatbuffers::ForwardsUOffset<&str>>(Self::VT_VERSION_FIRMWARE_GIT_HASH, None)
        }
    }
    #[inline]
    pub fn version_firmware_date(&self) -> Option<&'a str> {
        unsafe {
            self._tab
                .get::<flatbuffers::ForwardsUOffset<&str>>(Self::VT_VERSION_FIRMWARE_DATE, None)
        }
    }
    #[inline]
    pub fn modes_available(
        &self,
    ) -> Option<flatbuffers::Vector<'a, flatbuffers::ForwardsUOffset<&'a str>>> {
        unsafe {
            self._tab.get::<flatbuffers::ForwardsUOffset<
                flatbuffers::Vector<'a, flatbuffers::ForwardsUOffset<&'a str>>,
            >>(Self::VT_MODES_AVAILABLE, None)
        }
    }
    #[inline]
    pub fn mode_current(&self) -> Option<&'a str> {
        unsafe { self._tab.get::<flatbuffers::ForwardsUOffset<&str>>(Self::VT_MODE_CURRENT, None) }
    }
    #[inline]
    pub fn mode_pin_labels(
        &self,
    ) -> Option<flatbuffers::Vector<'a, flatbuffers::ForwardsUOffset<&'a str>>> {
        unsafe {
            self._tab.get::<flatbuffers::ForwardsUOffset<
                flatbuffers::Vector<'a, flatbuffers::ForwardsUOffset<&'a str>>,
            >>(Self::VT_MODE_PIN_LABELS, None)
        }
    }
    #[inline]
    pub fn mode_bitorder_msb(&self) -> bool {
        unsafe { self._tab.get::<bool>(Self::VT_MODE_BITORDER_MSB, Some(false)).unwrap() }
    }
    #[inline]
    pub fn mode_max_packet_size(&self) -> u16 {
        unsafe { self._tab.get::<u16>(Self::VT_MODE_MAX_PACKET_SIZE, Some(0)).unwrap() }
    }
    #[inline]
    pub fn mode_max_write(&self) -> u16 {
        unsafe { self._tab.get::<u16>(Self::VT_MODE_MAX_WRITE, Some(0)).unwrap() }
    }
    #[inline]
    pub fn mode_max_read(&self) -> u16 {
        unsafe { self._tab.get::<u16>(Self::VT_MODE_MAX_READ, Some(0)).unwrap() }
    }
    #[inline]
    pub fn psu_enabled(&self) -> bool {
        unsafe { self._tab.get::<bool>(Self::VT_PSU_ENABLED, Some(false)).unwrap() }
    }
    #[inline]
    pub fn psu_set_mv(&self) -> u32 {
        unsafe { self._tab.get::<u32>(Self::VT_PSU_SET_MV, Some(0)).unwrap() }
    }
    #[inline]
    pub fn psu_set_ma(&self) -> u32 {
        unsafe { self._tab.get::<u32>(Self::VT_PSU_SET_MA, Some(0)).unwrap() }
    }
    #[inline]
    pub fn psu_measured_mv(&self) -> u32 {
        unsafe { self._tab.get::<u32>(Self::VT_PSU_MEASURED_MV, Some(0)).unwrap() }
    }
    #[inline]
    pub fn psu_measured_ma(&self) -> u32 {
        unsafe { self._tab.get::<u32>(Self::VT_PSU_MEASURED_MA, Some(0)).unwrap() }
    }
    #[inline]
    pub fn psu_current_error(&self) -> bool {
        unsafe { self._tab.get::<bool>(Self::VT_PSU_CURRENT_ERROR, Some(false)).unwrap() }
    }
    #[inline]
    pub fn pullup_enabled(&self) -> bool {
        unsafe { self._tab.get::<bool>(Self::VT_PULLUP_ENABLED, Some(false)).unwrap() }
    }
    #[inline]
    pub fn adc_mv(&self) -> Option<flatbuffers::Vector<'a, u32>> {
        unsafe {
            self._tab
                .get::<flatbuffers::ForwardsUOffset<flatbuffers::Vector<'a, u32>>>(Self::VT_ADC_MV, None)
        }
    }
    #[inline]
    pub fn io_direction(&self) -> u8 {
        unsafe { self._tab.get::<u8>(Self::VT_IO_DIRECTION, Some(0)).unwrap() }
    }
    #[inline]
    pub fn io_value(&self) -> u8 {
        unsafe { self._tab.get::<u8>(Self::VT_IO_VALUE, Some(0)).unwrap() }
    }
    #[inline]
    pub fn disk_size_mb(&self) -> u32 {
        unsafe { self._tab.get::<u32>(Self::VT_DISK_SIZE_MB, Some(0)).unwrap() }
    }
    #[inline]
    pub fn disk_used_mb(&self) -> u32 {
        unsafe { self._tab.get::<u32>(Self::VT_DISK_USED_MB, Some(0)).unwrap() }
    }
    #[inline]
    pub fn led_count(&self) -> u8 {
        unsafe { self._tab.get::<u8>(Self::VT_LED_COUNT, Some(0)).unwrap() }
    }
}

impl Verifiable for StatusResponse<'_> {
    #[inline]
    fn run_verifier(
        v: &mut flatbuffers::Verifier,
        pos: usize,
    ) -> Result<(), flatbuffers::InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<flatbuffers::ForwardsUOffset<&str>>("error", Self::VT_ERROR, false)?
            .visit_field::<u16>("version_flatbuffers_major", Self::VT_VERSION_FLATBUFFERS_MAJOR, false)?
            .visit_field::<u16>("version_flatbuffers_minor", Self::VT_VERSION_FLATBUFFERS_MINOR, false)?
            .visit_field::<u16>("version_hardware_major", Self::VT_VERSION_HARDWARE_MAJOR, false)?
            .visit_field::<u16>("version_hardware_minor", Self::VT_VERSION_HARDWARE_MINOR, false)?
            .visit_field::<u16>("version_firmware_major", Self::VT_VERSION_FIRMWARE_MAJOR, false)?
            .visit_field::<u16>("version_firmware_minor", Self::VT_VERSION_FIRMWARE_MINOR, false)?
            .visit_field::<flatbuffers::ForwardsUOffset<&str>>(
                "version_firmware_git_hash",
                Self::VT_VERSION_FIRMWARE_GIT_HASH,
                false,
            )?
            .visit_field::<flatbuffers::ForwardsUOffset<&str>>(
                "version_firmware_date",
                Self::VT_VERSION_FIRMWARE_DATE,
                false,
            )?
            .visit_field::<flatbuffers::ForwardsUOffset<
                flatbuffers::Vector<'_, flatbuffers::ForwardsUOffset<&'_ str>>,
            >>("modes_available", Self::VT_MODES_AVAILABLE, false)?
            .visit_field::<flatbuffers::ForwardsUOffset<&str>>("mode_current", Self::VT_MODE_CURRENT, false)?
            .visit_field::<flatbuffers::ForwardsUOffset<
                flatbuffers::Vector<'_, flatbuffers::ForwardsUOffset<&'_ str>>,
            >>("mode_pin_labels", Self::VT_MODE_PIN_LABELS, false)?
            .visit_field::<bool>("mode_bitorder_msb", Self::VT_MODE_BITORDER_MSB, false)?
            .visit_field::<u16>("mode_max_packet_size", Self::VT_MODE_MAX_PACKET_SIZE, false)?
            .visit_field::<u16>("mode_max_write", Self::VT_MODE_MAX_WRITE, false)?
            .visit_field::<u16>("mode_max_read", Self::VT_MODE_MAX_READ, false)?
            .visit_field::<bool>("psu_enabled", Self::VT_PSU_ENABLED, false)?
            .visit_field::<u32>("psu_set_mv", Self::VT_PSU_SET_MV, false)?
            .visit_field::<u32>("psu_set_ma", Self::VT_PSU_SET_MA, false)?
            .visit_field::<u32>("psu_measured_mv", Self::VT_PSU_MEASURED_MV, false)?
            .visit_field::<u32>("psu_measured_ma", Self::VT_PSU_MEASURED_MA, false)?
            .visit_field::<bool>("psu_current_error", Self::VT_PSU_CURRENT_ERROR, false)?
            .visit_field::<bool>("pullup_enabled", Self::VT_PULLUP_ENABLED, false)?
            .visit_field::<flatbuffers::ForwardsUOffset<flatbuffers::Vector<'_, u32>>>(
                "adc_mv",
                Self::VT_ADC_MV,
                false,
            )?
            .visit_field::<u8>("io_direction", Self::VT_IO_DIRECTION, false)?
            .visit_field::<u8>("io_value", Self::VT_IO_VALUE, false)?
            .visit_field::<u32>("disk_size_mb", Self::VT_DISK_SIZE_MB, false)?
            .visit_field::<u32>("disk_used_mb", Self::VT_DISK_USED_MB, false)?
            .visit_field::<u8>("led_count", Self::VT_LED_COUNT, false)?
            .finish();
        Ok(())
    }
}

#[derive(Default)]
pub struct StatusResponseArgs<'a> {
    pub error: Option<flatbuffers::WIPOffset<&'a str>>,
    pub version_flatbuffers_major: u16,
    pub version_flatbuffers_minor: u16,
    pub version_hardware_major: u16,
    pub version_hardware_minor: u16,
    pub version_firmware_major: u16,
    pub version_firmware_minor: u16,
    pub version_firmware_git_hash: Option<flatbuffers::WIPOffset<&'a str>>,
    pub version_firmware_date: Option<flatbuffers::WIPOffset<&'a str>>,
    pub modes_available: Option<
        flatbuffers::WIPOffset<flatbuffers::Vector<'a, flatbuffers::ForwardsUOffset<&'a str>>>,
    >,
    pub mode_current: Option<flatbuffers::WIPOffset<&'a str>>,
    pub mode_pin_labels: Option<
        flatbuffers::WIPOffset<flatbuffers::Vector<'a, flatbuffers::ForwardsUOffset<&'a str>>>,
    >,
    pub mode_bitorder_msb: bool,
    pub mode_max_packet_size: u16,
    pub mode_max_write: u16,
    pub mode_max_read: u16,
    pub psu_enabled: bool,
    pub psu_set_mv: u32,
    pub psu_set_ma: u32,
    pub psu_measured_mv: u32,
    pub psu_measured_ma: u32,
    pub psu_current_error: bool,
    pub pullup_enabled: bool,
    pub adc_mv: Option<flatbuffers::WIPOffset<flatbuffers::Vector<'a, u32>>>,
    pub io_direction: u8,
    pub io_value: u8,
    pub disk_size_mb: u32,
    pub disk_used_mb: u32,
    pub led_count: u8,
}

/* ------------------------------------------------------------------ */
/* RequestPacket / ResponsePacket                                     */
/* ------------------------------------------------------------------ */

#[derive(Copy, Clone, PartialEq)]
pub struct RequestPacket<'a> {
    pub _tab: flatbuffers::Table<'a>,
}

impl<'a> flatbuffers::Follow<'a> for RequestPacket<'a> {
    type Inner = RequestPacket<'a>;
    #[inline]
    unsafe fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
        Self { _tab: unsafe { flatbuffers::Table::new(buf, loc) } }
    }
}

impl<'a> RequestPacket<'a> {
    pub const VT_VERSION_MAJOR: flatbuffers::VOffsetT = 4;
    pub const VT_MINIMUM_VERSION_MINOR: flatbuffers::VOffsetT = 6;
    pub const VT_CONTENTS_TYPE: flatbuffers::VOffsetT = 8;
    pub const VT_CONTENTS: flatbuffers::VOffsetT = 10;

    #[inline]
    pub unsafe fn init_from_table(table: flatbuffers::Table<'a>) -> Self {
        RequestPacket { _tab: table }
    }

    pub fn create<'bldr: 'args, 'args: 'mut_bldr, 'mut_bldr>(
        fbb: &'mut_bldr mut flatbuffers::FlatBufferBuilder<'bldr>,
        args: &'args RequestPacketArgs,
    ) -> flatbuffers::WIPOffset<RequestPacket<'bldr>> {
        let start = fbb.start_table();
        fbb.push_slot::<u8>(Self::VT_VERSION_MAJOR, args.version_major, 0);
        fbb.push_slot::<u8>(Self::VT_MINIMUM_VERSION_MINOR, args.minimum_version_minor, 0);
        fbb.push_slot::<RequestPacketContents>(
            Self::VT_CONTENTS_TYPE,
            args.contents_type,
            RequestPacketContents::NONE,
        );
        if let Some(x) = args.contents {
            fbb.push_slot_always::<flatbuffers::WIPOffset<_>>(Self::VT_CONTENTS, x);
        }
        let end = fbb.end_table(start);
        flatbuffers::WIPOffset::new(end.value())
    }

    #[inline]
    pub fn version_major(&self) -> u8 {
        unsafe { self._tab.get::<u8>(Self::VT_VERSION_MAJOR, Some(0)).unwrap() }
    }
    #[inline]
    pub fn minimum_version_minor(&self) -> u8 {
        unsafe { self._tab.get::<u8>(Self::VT_MINIMUM_VERSION_MINOR, Some(0)).unwrap() }
    }
    #[inline]
    pub fn contents_type(&self) -> RequestPacketContents {
        unsafe {
            self._tab
                .get::<RequestPacketContents>(Self::VT_CONTENTS_TYPE, Some(RequestPacketContents::NONE))
                .unwrap()
        }
    }
    #[inline]
    pub fn contents(&self) -> Option<flatbuffers::Table<'a>> {
        unsafe {
            self._tab
                .get::<flatbuffers::ForwardsUOffset<flatbuffers::Table<'a>>>(Self::VT_CONTENTS, None)
        }
    }
    #[inline]
    pub fn contents_as_configuration_request(&self) -> Option<ConfigurationRequest<'a>> {
        if self.contents_type() == RequestPacketContents::ConfigurationRequest {
            self.contents().map(|t| unsafe { ConfigurationRequest::init_from_table(t) })
        } else {
            None
        }
    }
    #[inline]
    pub fn contents_as_data_request(&self) -> Option<DataRequest<'a>> {
        if self.contents_type() == RequestPacketContents::DataRequest {
            self.contents().map(|t| unsafe { DataRequest::init_from_table(t) })
        } else {
            None
        }
    }
    #[inline]
    pub fn contents_as_status_request(&self) -> Option<StatusRequest<'a>> {
        if self.contents_type() == RequestPacketContents::StatusRequest {
            self.contents().map(|t| unsafe { StatusRequest::init_from_table(t) })
        } else {
            None
        }
    }
}

impl Verifiable for RequestPacket<'_> {
    #[inline]
    fn run_verifier(
        v: &mut flatbuffers::Verifier,
        pos: usize,
    ) -> Result<(), flatbuffers::InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<u8>("version_major", Self::VT_VERSION_MAJOR, false)?
            .visit_field::<u8>("minimum_version_minor", Self::VT_MINIMUM_VERSION_MINOR, false)?
            .visit_union::<RequestPacketContents, _>(
                "contents_type",
                Self::VT_CONTENTS_TYPE,
                "contents",
                Self::VT_CONTENTS,
                false,
                |key, v, pos| match key {
                    RequestPacketContents::ConfigurationRequest => v
                        .verify_union_variant::<flatbuffers::ForwardsUOffset<ConfigurationRequest>>(
                            "RequestPacketContents::ConfigurationRequest",
                            pos,
                        ),
                    RequestPacketContents::DataRequest => v
                        .verify_union_variant::<flatbuffers::ForwardsUOffset<DataRequest>>(
                            "RequestPacketContents::DataRequest",
                            pos,
                        ),
                    RequestPacketContents::StatusRequest => v
                        .verify_union_variant::<flatbuffers::ForwardsUOffset<StatusRequest>>(
                            "RequestPacketContents::StatusRequest",
                            pos,
                        ),
                    _ => Ok(()),
                },
            )?
            .finish();
        Ok(())
    }
}

pub struct RequestPacketArgs {
    pub version_major: u8,
    pub minimum_version_minor: u8,
    pub contents_type: RequestPacketContents,
    pub contents: Option<flatbuffers::WIPOffset<flatbuffers::UnionWIPOffset>>,
}

impl Default for RequestPacketArgs {
    fn default() -> Self {
        Self {
            version_major: 0,
            minimum_version_minor: 0,
            contents_type: RequestPacketContents::NONE,
            contents: None,
        }
    }
}

#[derive(Copy, Clone, PartialEq)]
pub struct ResponsePacket<'a> {
    pub _tab: flatbuffers::Table<'a>,
}

impl<'a> flatbuffers::Follow<'a> for ResponsePacket<'a> {
    type Inner = ResponsePacket<'a>;
    #[inline]
    unsafe fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
        Self { _tab: unsafe { flatbuffers::Table::new(buf, loc) } }
    }
}

impl<'a> ResponsePacket<'a> {
    pub const VT_ERROR: flatbuffers::VOffsetT = 4;
    pub const VT_CONTENTS_TYPE: flatbuffers::VOffsetT = 6;
    pub const VT_CONTENTS: flatbuffers::VOffsetT = 8;

    #[inline]
    pub unsafe fn init_from_table(table: flatbuffers::Table<'a>) -> Self {
        ResponsePacket { _tab: table }
    }

    pub fn create<'bldr: 'args, 'args: 'mut_bldr, 'mut_bldr>(
        fbb: &'mut_bldr mut flatbuffers::FlatBufferBuilder<'bldr>,
        args: &'args ResponsePacketArgs<'args>,
    ) -> flatbuffers::WIPOffset<ResponsePacket<'bldr>> {
        let start = fbb.start_table();
        if let Some(x) = args.error {
            fbb.push_slot_always::<flatbuffers::WIPOffset<&str>>(Self::VT_ERROR, x);
        }
        fbb.push_slot::<ResponsePacketContents>(
            Self::VT_CONTENTS_TYPE,
            args.contents_type,
            ResponsePacketContents::NONE,
        );
        if let Some(x) = args.contents {
            fbb.push_slot_always::<flatbuffers::WIPOffset<_>>(Self::VT_CONTENTS, x);
        }
        let end = fbb.end_table(start);
        flatbuffers::WIPOffset::new(end.value())
    }

    #[inline]
    pub fn error(&self) -> Option<&'a str> {
        unsafe { self._tab.get::<flatbuffers::ForwardsUOffset<&str>>(Self::VT_ERROR, None) }
    }
    #[inline]
    pub fn contents_type(&self) -> ResponsePacketContents {
        unsafe {
            self._tab
                .get::<ResponsePacketContents>(Self::VT_CONTENTS_TYPE, Some(ResponsePacketContents::NONE))
                .unwrap()
        }
    }
    #[inline]
    pub fn contents(&self) -> Option<flatbuffers::Table<'a>> {
        unsafe {
            self._tab
                .get::<flatbuffers::ForwardsUOffset<flatbuffers::Table<'a>>>(Self::VT_CONTENTS, None)
        }
    }
    #[inline]
    pub fn contents_as_configuration_response(&self) -> Option<ConfigurationResponse<'a>> {
        if self.contents_type() == ResponsePacketContents::ConfigurationResponse {
            self.contents().map(|t| unsafe { ConfigurationResponse::init_from_table(t) })
        } else {
            None
        }
    }
    #[inline]
    pub fn contents_as_data_response(&self) -> Option<DataResponse<'a>> {
        if self.contents_type() == ResponsePacketContents::DataResponse {
            self.contents().map(|t| unsafe { DataResponse::init_from_table(t) })
        } else {
            None
        }
    }
    #[inline]
    pub fn contents_as_status_response(&self) -> Option<StatusResponse<'a>> {
        if self.contents_type() == ResponsePacketContents::StatusResponse {
            self.contents().map(|t| unsafe { StatusResponse::init_from_table(t) })
        } else {
            None
        }
    }
}

impl Verifiable for ResponsePacket<'_> {
    #[inline]
    fn run_verifier(
        v: &mut flatbuffers::Verifier,
        pos: usize,
    ) -> Result<(), flatbuffers::InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<flatbuffers::ForwardsUOffset<&str>>("error", Self::VT_ERROR, false)?
            .visit_union::<ResponsePacketContents, _>(
                "contents_type",
                Self::VT_CONTENTS_TYPE,
                "contents",
                Self::VT_CONTENTS,
                false,
                |key, v, pos| match key {
                    ResponsePacketContents::ConfigurationResponse => v
                        .verify_union_variant::<flatbuffers::ForwardsUOffset<ConfigurationResponse>>(
                            "ResponsePacketContents::ConfigurationResponse",
                            pos,
                        ),
                    ResponsePacketContents::DataResponse => v
                        .verify_union_variant::<flatbuffers::ForwardsUOffset<DataResponse>>(
                            "ResponsePacketContents::DataResponse",
                            pos,
                        ),
                    ResponsePacketContents::StatusResponse => v
                        .verify_union_variant::<flatbuffers::ForwardsUOffset<StatusResponse>>(
                            "ResponsePacketContents::StatusResponse",
                            pos,
                        ),
                    _ => Ok(()),
                },
            )?
            .finish();
        Ok(())
    }
}

pub struct ResponsePacketArgs<'a> {
    pub error: Option<flatbuffers::WIPOffset<&'a str>>,
    pub contents_type: ResponsePacketContents,
    pub contents: Option<flatbuffers::WIPOffset<flatbuffers::UnionWIPOffset>>,
}

impl Default for ResponsePacketArgs<'_> {
    fn default() -> Self {
        Self {
            error: None,
            contents_type: ResponsePacketContents::NONE,
            contents: None,
        }
    }
}

/* Root accessors with verification. */
pub fn root_as_request_packet(buf: &[u8]) -> Result<RequestPacket, flatbuffers::InvalidFlatbuffer> {
    flatbuffers::root::<RequestPacket>(buf)
}

pub fn root_as_response_packet(buf: &[u8]) -> Result<ResponsePacket, flatbuffers::InvalidFlatbuffer> {
    flatbuffers::root::<ResponsePacket>(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_request_packet_roundtrip() {
        let mut fbb = flatbuffers::FlatBufferBuilder::with_capacity(256);
        let query = fbb.create_vector::<u8>(&[status_query::ALL]);
        let status = StatusRequest::create(&mut fbb, &StatusRequestArgs { query: Some(query) });
        let packet = RequestPacket::create(
            &mut fbb,
            &RequestPacketArgs {
                version_major: 2,
                minimum_version_minor: 0,
                contents_type: RequestPacketContents::StatusRequest,
                contents: Some(status.as_union_value()),
            },
        );
        fbb.finish(packet, None);

        let parsed = root_as_request_packet(fbb.finished_data()).unwrap();
        assert_eq!(parsed.version_major(), 2);
        assert_eq!(parsed.contents_type(), RequestPacketContents::StatusRequest);
        let status = parsed.contents_as_status_request().unwrap();
        let query = status.query().unwrap();
        assert_eq!(query.len(), 1);
        assert_eq!(query.get(0), status_query::ALL);
        /* Wrong-arm accessors return nothing */
        assert!(parsed.contents_as_data_request().is_none());
    }

    #[test]
    fn status_response_fields_roundtrip() {
        let mut fbb = flatbuffers::FlatBufferBuilder::with_capacity(512);
        let hash = fbb.create_string("ab12cd3");
        let mode = fbb.create_string("HiZ");
        let hiz = fbb.create_string("HiZ");
        let spi = fbb.create_string("SPI");
        let modes = fbb.create_vector(&[hiz, spi]);
        let adc = fbb.create_vector::<u32>(&[0, 0, 0, 0, 0, 0, 0, 0]);
        let status = StatusResponse::create(
            &mut fbb,
            &StatusResponseArgs {
                version_flatbuffers_major: 2,
                version_flatbuffers_minor: 3,
                version_hardware_major: 5,
                version_firmware_major: 2,
                version_firmware_minor: 3,
                version_firmware_git_hash: Some(hash),
                modes_available: Some(modes),
                mode_current: Some(mode),
                psu_enabled: false,
                adc_mv: Some(adc),
                io_direction: 0b0000_1111,
                ..Default::default()
            },
        );
        let packet = ResponsePacket::create(
            &mut fbb,
            &ResponsePacketArgs {
                error: None,
                contents_type: ResponsePacketContents::StatusResponse,
                contents: Some(status.as_union_value()),
            },
        );
        fbb.finish(packet, None);

        let parsed = root_as_response_packet(fbb.finished_data()).unwrap();
        assert!(parsed.error().is_none());
        let status = parsed.contents_as_status_response().unwrap();
        assert_eq!(status.version_flatbuffers_major(), 2);
        assert_eq!(status.version_firmware_major(), 2);
        assert_eq!(status.version_firmware_git_hash(), Some("ab12cd3"));
        assert_eq!(status.mode_current(), Some("HiZ"));
        assert!(!status.psu_enabled());
        let modes: Vec<&str> = status.modes_available().unwrap().iter().collect();
        assert_eq!(modes, vec!["HiZ", "SPI"]);
        assert_eq!(status.adc_mv().unwrap().len(), 8);
        assert_eq!(status.io_direction(), 0b0000_1111);
        /* Unset scalar fields read as their defaults */
        assert_eq!(status.led_count(), 0);
        assert_eq!(status.mode_max_write(), 0);
    }

    #[test]
    fn data_request_roundtrip() {
        let mut fbb = flatbuffers::FlatBufferBuilder::with_capacity(256);
        let payload = fbb.create_vector::<u8>(&[0x9F]);
        let data = DataRequest::create(
            &mut fbb,
            &DataRequestArgs {
                start_main: Some(true),
                data_write: Some(payload),
                bytes_read: Some(3),
                stop_main: Some(true),
                ..Default::default()
            },
        );
        let packet = RequestPacket::create(
            &mut fbb,
            &RequestPacketArgs {
                version_major: 2,
                minimum_version_minor: 0,
                contents_type: RequestPacketContents::DataRequest,
                contents: Some(data.as_union_value()),
            },
        );
        fbb.finish(packet, None);

        let parsed = root_as_request_packet(fbb.finished_data()).unwrap();
        let data = parsed.contents_as_data_request().unwrap();
        assert!(data.start_main());
        assert!(!data.start_alt());
        assert_eq!(data.data_write().unwrap().bytes(), &[0x9F]);
        assert_eq!(data.bytes_read(), 3);
        assert!(data.stop_main());
    }

    #[test]
    fn error_response_roundtrip() {
        let mut fbb = flatbuffers::FlatBufferBuilder::with_capacity(128);
        let msg = fbb.create_string("mode not available");
        let config = ConfigurationResponse::create(
            &mut fbb,
            &ConfigurationResponseArgs { error: Some(msg) },
        );
        let packet = ResponsePacket::create(
            &mut fbb,
            &ResponsePacketArgs {
                error: None,
                contents_type: ResponsePacketContents::ConfigurationResponse,
                contents: Some(config.as_union_value()),
            },
        );
        fbb.finish(packet, None);

        let parsed = root_as_response_packet(fbb.finished_data()).unwrap();
        let config = parsed.contents_as_configuration_response().unwrap();
        assert_eq!(config.error(), Some("mode not available"));
    }

    #[test]
    fn garbage_fails_verification() {
        assert!(root_as_response_packet(&[0xDE, 0xAD, 0xBE, 0xEF]).is_err());
        assert!(root_as_request_packet(&[]).is_err());
    }

    #[test]
    fn mode_configuration_fields() {
        let mut fbb = flatbuffers::FlatBufferBuilder::with_capacity(256);
        let mc = ModeConfiguration::create(
            &mut fbb,
            &ModeConfigurationArgs {
                speed: Some(1_000_000),
                clock_polarity: Some(false),
                clock_phase: Some(true),
                chip_select_idle: Some(true),
                ..Default::default()
            },
        );
        let req = ConfigurationRequest::create(
            &mut fbb,
            &ConfigurationRequestArgs {
                mode_configuration: Some(mc),
                ..Default::default()
            },
        );
        let packet = RequestPacket::create(
            &mut fbb,
            &RequestPacketArgs {
                version_major: 2,
                minimum_version_minor: 0,
                contents_type: RequestPacketContents::ConfigurationRequest,
                contents: Some(req.as_union_value()),
            },
        );
        fbb.finish(packet, None);

        let parsed = root_as_request_packet(fbb.finished_data()).unwrap();
        let req = parsed.contents_as_configuration_request().unwrap();
        let mc = req.mode_configuration().unwrap();
        assert_eq!(mc.speed(), 1_000_000);
        assert!(!mc.clock_polarity());
        assert!(mc.clock_phase());
        assert!(mc.chip_select_idle());
        /* Unset string field is absent */
        assert!(mc.submode().is_none());
    }
}
