use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use coap_lite::RequestType;

/// Bitmask of request methods accepted by a resource, plus the subtree matching flag.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct Methods(u16);

impl Methods {
    pub const GET: Methods = Methods(1 << 0);
    pub const POST: Methods = Methods(1 << 1);
    pub const PUT: Methods = Methods(1 << 2);
    pub const DELETE: Methods = Methods(1 << 3);
    pub const FETCH: Methods = Methods(1 << 4);
    pub const PATCH: Methods = Methods(1 << 5);
    pub const IPATCH: Methods = Methods(1 << 6);

    /// Resource path matches as a prefix: `/echo/` answers `/echo/anything/below`.
    pub const MATCH_SUBTREE: Methods = Methods(1 << 15);

    const METHOD_BITS: u16 = 0x7f;

    pub const fn empty() -> Self {
        Methods(0)
    }

    pub const fn contains(self, other: Methods) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_subtree(self) -> bool {
        self.contains(Self::MATCH_SUBTREE)
    }

    /// Request methods only, without flags.
    pub const fn methods_only(self) -> Methods {
        Methods(self.0 & Self::METHOD_BITS)
    }

    /// Flag for a single request method.  Methods unknown to `coap_lite` have none and can
    /// never be routed.
    pub fn from_request_type(method: RequestType) -> Option<Methods> {
        match method {
            RequestType::Get => Some(Self::GET),
            RequestType::Post => Some(Self::POST),
            RequestType::Put => Some(Self::PUT),
            RequestType::Delete => Some(Self::DELETE),
            RequestType::Fetch => Some(Self::FETCH),
            RequestType::Patch => Some(Self::PATCH),
            RequestType::IPatch => Some(Self::IPATCH),
            _ => None,
        }
    }
}

impl BitOr for Methods {
    type Output = Methods;

    fn bitor(self, rhs: Self) -> Self::Output {
        Methods(self.0 | rhs.0)
    }
}

impl BitOrAssign for Methods {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for Methods {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(Methods, &str); 8] = [
            (Methods::GET, "GET"),
            (Methods::POST, "POST"),
            (Methods::PUT, "PUT"),
            (Methods::DELETE, "DELETE"),
            (Methods::FETCH, "FETCH"),
            (Methods::PATCH, "PATCH"),
            (Methods::IPATCH, "IPATCH"),
            (Methods::MATCH_SUBTREE, "MATCH_SUBTREE"),
        ];
        let names: Vec<_> = NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "Methods({})", names.join(" | "))
    }
}
