use core::fmt;

macro_rules! opcodes {
    ($($variant:ident => $name:literal,)*) => {
        #[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
        pub enum Opcode {
            $($variant,)*
        }

        impl Opcode {
            pub const ALL: &'static [Self] = &[$(Self::$variant,)*];

            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)*
                }
            }
        }
    };
}

opcodes! {
    // pseudo instructions, lowered after register allocation.
    PLogicalStart => "p_logical_start",
    PLogicalEnd => "p_logical_end",
    PBranch => "p_branch",
    PCbranchZ => "p_cbranch_z",
    PCbranchNz => "p_cbranch_nz",
    PPhi => "p_phi",
    PBooleanPhi => "p_boolean_phi",
    PLinearPhi => "p_linear_phi",
    PParallelcopy => "p_parallelcopy",
    PSplitVector => "p_split_vector",
    PCreateVector => "p_create_vector",
    PExtractVector => "p_extract_vector",
    PExtract => "p_extract",
    PAsUniform => "p_as_uniform",
    PDiscardIf => "p_discard_if",
    PDemoteToHelper => "p_demote_to_helper",
    PEndWqm => "p_end_wqm",

    // scalar
    SAddU32 => "s_add_u32",
    SSubU32 => "s_sub_u32",
    SMulI32 => "s_mul_i32",
    SAndB32 => "s_and_b32",
    SAndB64 => "s_and_b64",
    SOrB32 => "s_or_b32",
    SOrB64 => "s_or_b64",
    SXorB32 => "s_xor_b32",
    SXorB64 => "s_xor_b64",
    SLshlB32 => "s_lshl_b32",
    SLshrB32 => "s_lshr_b32",
    SAshrI32 => "s_ashr_i32",
    SCmpEqU32 => "s_cmp_eq_u32",
    SCmpLtU32 => "s_cmp_lt_u32",
    SCselectB32 => "s_cselect_b32",
    SCselectB64 => "s_cselect_b64",
    SBufferLoadDword => "s_buffer_load_dword",
    SEndpgm => "s_endpgm",

    // vector
    VMovB32 => "v_mov_b32",
    VAddCoU32 => "v_add_co_u32",
    VAddU32 => "v_add_u32",
    VSubCoU32 => "v_sub_co_u32",
    VSubU32 => "v_sub_u32",
    VAddU16 => "v_add_u16",
    VSubU16 => "v_sub_u16",
    VMulLoU32 => "v_mul_lo_u32",
    VMulLoU16 => "v_mul_lo_u16",
    VAndB32 => "v_and_b32",
    VOrB32 => "v_or_b32",
    VXorB32 => "v_xor_b32",
    VLshlrevB32 => "v_lshlrev_b32",
    VLshrrevB32 => "v_lshrrev_b32",
    VAshrrevI32 => "v_ashrrev_i32",
    VLshlrevB16 => "v_lshlrev_b16",
    VCmpEqU32 => "v_cmp_eq_u32",
    VCmpLtU32 => "v_cmp_lt_u32",
    VAddF32 => "v_add_f32",
    VMulF32 => "v_mul_f32",
    VAddF16 => "v_add_f16",
    VMulF16 => "v_mul_f16",
    VSubF32 => "v_sub_f32",
    VReadfirstlaneB32 => "v_readfirstlane_b32",
    BufferLoadDword => "buffer_load_dword",
    BufferLoadDwordx2 => "buffer_load_dwordx2",
    BufferLoadDwordx3 => "buffer_load_dwordx3",
    BufferLoadDwordx4 => "buffer_load_dwordx4",
    ImageSample => "image_sample",
}

impl Opcode {
    #[must_use]
    pub const fn is_branch(self) -> bool {
        matches!(self, Self::PBranch | Self::PCbranchZ | Self::PCbranchNz)
    }

    #[must_use]
    pub const fn is_phi(self) -> bool {
        matches!(self, Self::PPhi | Self::PBooleanPhi | Self::PLinearPhi)
    }

    /// Memory accesses through the vector memory unit.
    #[must_use]
    pub const fn is_vmem(self) -> bool {
        matches!(
            self,
            Self::BufferLoadDword
                | Self::BufferLoadDwordx2
                | Self::BufferLoadDwordx3
                | Self::BufferLoadDwordx4
                | Self::ImageSample
        )
    }

    #[must_use]
    pub const fn is_pseudo(self) -> bool {
        self.as_str().as_bytes()[0] == b'p'
    }

    /// The buffer load that fetches `dwords` consecutive dwords.
    #[must_use]
    pub const fn buffer_load(dwords: u8) -> Option<Self> {
        match dwords {
            1 => Some(Self::BufferLoadDword),
            2 => Some(Self::BufferLoadDwordx2),
            3 => Some(Self::BufferLoadDwordx3),
            4 => Some(Self::BufferLoadDwordx4),
            _ => None,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
