use rusticata_macros::newtype_enum;

/// Data link type
///
/// The link-layer header type specifies the type of headers at the beginning
/// of the packet.
///
/// See <http://www.tcpdump.org/linktypes.html>
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Linktype(pub i32);

newtype_enum! {
impl display Linktype {
    NULL = 0,
    ETHERNET = 1,

    RAW = 101,

    LOOP = 108,
    LINUX_SLL = 113,

    // Raw IPv4; the packet begins with an IPv4 header.
    IPV4 = 228,
}
}

impl Linktype {
    /// Returns true if the header parser knows how to decode this link type
    pub fn is_supported(self) -> bool {
        matches!(
            self,
            Linktype::NULL
                | Linktype::ETHERNET
                | Linktype::RAW
                | Linktype::LOOP
                | Linktype::LINUX_SLL
                | Linktype::IPV4
        )
    }
}
