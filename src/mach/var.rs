use crate::lang::Error;
use std::rc::Rc;

type Result<T> = std::result::Result<T, Error>;

pub type VarId = usize;
pub type LibId = usize;

const BUCKETS: usize = 64;
pub const STATIC_SLOTS: usize = 28;
const STDFORMAT: i32 = 0;

/// ## Variables and symbol tables
///
/// Every dynamic variable, array, procedure and function lives in one
/// arena; hash chains index it per bucket. Each loaded library gets its
/// own chain heads so a reference made from library code searches the
/// library's table before the main one. The static integers `A%..Z%`
/// and `@%` sit in a fixed slot array, bypass hashing, and are never
/// destroyed.

#[derive(Debug)]
pub struct Variables {
    statics: [i32; STATIC_SLOTS],
    arena: Vec<Var>,
    main: [Option<VarId>; BUCKETS],
    libs: Vec<[Option<VarId>; BUCKETS]>,
}

#[derive(Debug)]
pub struct Var {
    pub name: Rc<str>,
    pub hash: u32,
    pub owner: Option<LibId>,
    next: Option<VarId>,
    pub body: VarBody,
}

#[derive(Debug)]
pub enum VarBody {
    Uint8(u8),
    Int(i32),
    Int64(i64),
    Float(f64),
    Str(String),
    Array {
        elem: ElemType,
        desc: Option<ArrayDesc>,
    },
    /// A PROC or FN whose definition has been parsed.
    Proc(ProcDef),
    /// A PROC or FN whose definition site is known but not yet parsed;
    /// the address is that of the name token after `DEF`.
    Marker(usize),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ElemType {
    Uint8,
    Int,
    Int64,
    Float,
    Str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayDesc {
    /// Size of each dimension (declared bound + 1).
    pub dims: Vec<usize>,
    pub data: ArrayData,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    Uint8(Vec<u8>),
    Int(Vec<i32>),
    Int64(Vec<i64>),
    Float(Vec<f64>),
    Str(Vec<String>),
}

impl ArrayDesc {
    pub fn new(elem: ElemType, dims: Vec<usize>) -> ArrayDesc {
        let total = dims.iter().product();
        let data = match elem {
            ElemType::Uint8 => ArrayData::Uint8(vec![0; total]),
            ElemType::Int => ArrayData::Int(vec![0; total]),
            ElemType::Int64 => ArrayData::Int64(vec![0; total]),
            ElemType::Float => ArrayData::Float(vec![0.0; total]),
            ElemType::Str => ArrayData::Str(vec![String::new(); total]),
        };
        ArrayDesc { dims, data }
    }

    pub fn len(&self) -> usize {
        self.dims.iter().product()
    }

    /// Row-major linear index with a per-dimension bounds check.
    pub fn index(&self, subscripts: &[i64]) -> Result<usize> {
        if subscripts.len() != self.dims.len() {
            return Err(error!(Subscript));
        }
        let mut linear = 0;
        for (subscript, size) in subscripts.iter().zip(&self.dims) {
            if *subscript < 0 || *subscript as usize >= *size {
                return Err(error!(Subscript));
            }
            linear = linear * size + *subscript as usize;
        }
        Ok(linear)
    }
}

#[derive(Debug, Clone)]
pub struct ProcDef {
    /// Address of the first statement of the body.
    pub entry: usize,
    pub parms: Vec<Parm>,
    /// True for the single plain int32 parameter fast path.
    pub simple: bool,
}

#[derive(Debug, Clone)]
pub struct Parm {
    pub slot: ParmSlot,
    pub is_return: bool,
}

/// A formal parameter is either a named variable or one of the static
/// integer slots.
#[derive(Debug, Clone)]
pub enum ParmSlot {
    Var(Rc<str>),
    Static(u8),
}

/// An assignable location.
#[derive(Debug, Clone, PartialEq)]
pub enum Lvalue {
    Static(u8),
    Scalar(VarId),
    Elem(VarId, usize),
    WholeArray(VarId),
    ByteMem(usize),
    WordMem(usize),
    LongMem(usize),
    FloatMem(usize),
    StrMem(usize),
}

/// A saved prior value, typed, for LOCAL and RETURN-parameter frames.
#[derive(Debug, Clone)]
pub enum Saved {
    Uint8(u8),
    Int(i32),
    Int64(i64),
    Float(f64),
    Str(String),
    Desc(Option<ArrayDesc>),
}

pub fn hash(name: &str) -> u32 {
    let mut h: u32 = 0;
    for b in name.bytes() {
        h = h.wrapping_mul(5) ^ b as u32;
    }
    h
}

/// Variable kind from the name suffix. Array names keep their trailing
/// `(`; the character before it selects the element type.
pub fn name_type(name: &str) -> (ElemType, bool) {
    let bytes = name.as_bytes();
    let (bytes, is_array) = match bytes.last() {
        Some(b'(') => (&bytes[..bytes.len() - 1], true),
        _ => (bytes, false),
    };
    let elem = match bytes.last() {
        Some(b'%') => {
            if bytes.len() >= 2 && bytes[bytes.len() - 2] == b'%' {
                ElemType::Int64
            } else {
                ElemType::Int
            }
        }
        Some(b'&') => ElemType::Uint8,
        Some(b'$') => ElemType::Str,
        _ => ElemType::Float,
    };
    (elem, is_array)
}

impl Variables {
    pub fn new() -> Variables {
        let mut statics = [0; STATIC_SLOTS];
        statics[crate::lang::ATPC as usize] = STDFORMAT;
        Variables {
            statics,
            arena: Vec::new(),
            main: [None; BUCKETS],
            libs: Vec::new(),
        }
    }

    /// Discard all dynamic variables. The statics keep their values.
    pub fn clear(&mut self) {
        self.arena.clear();
        self.main = [None; BUCKETS];
        for lib in self.libs.iter_mut() {
            *lib = [None; BUCKETS];
        }
    }

    pub fn static_get(&self, slot: u8) -> i32 {
        self.statics[slot as usize]
    }

    pub fn static_set(&mut self, slot: u8, value: i32) {
        self.statics[slot as usize] = value;
    }

    pub fn add_lib(&mut self) -> LibId {
        self.libs.push([None; BUCKETS]);
        self.libs.len() - 1
    }

    pub fn get(&self, id: VarId) -> &Var {
        &self.arena[id]
    }

    pub fn get_mut(&mut self, id: VarId) -> &mut Var {
        &mut self.arena[id]
    }

    fn chain(&self, head: Option<VarId>, name: &str, h: u32) -> Option<VarId> {
        let mut next = head;
        while let Some(id) = next {
            let var = &self.arena[id];
            if var.hash == h && *var.name == *name {
                return Some(id);
            }
            next = var.next;
        }
        None
    }

    /// References made inside a library search its table first, then
    /// the main table.
    pub fn find(&self, name: &str, context: Option<LibId>) -> Option<VarId> {
        let h = hash(name);
        if let Some(lib) = context {
            let head = self.libs[lib][h as usize % BUCKETS];
            if let Some(id) = self.chain(head, name, h) {
                return Some(id);
            }
        }
        self.chain(self.main[h as usize % BUCKETS], name, h)
    }

    /// Create a variable with the zero value for its name's type. The
    /// owner decides which table chains it.
    pub fn create(&mut self, name: &str, owner: Option<LibId>) -> VarId {
        let h = hash(name);
        let (elem, is_array) = name_type(name);
        let body = if is_array {
            VarBody::Array { elem, desc: None }
        } else {
            match elem {
                ElemType::Uint8 => VarBody::Uint8(0),
                ElemType::Int => VarBody::Int(0),
                ElemType::Int64 => VarBody::Int64(0),
                ElemType::Float => VarBody::Float(0.0),
                ElemType::Str => VarBody::Str(String::new()),
            }
        };
        self.insert(name, h, owner, body)
    }

    /// Create a marker entry for a PROC/FN definition site.
    pub fn create_marker(&mut self, name: &str, site: usize, owner: Option<LibId>) -> VarId {
        let h = hash(name);
        self.insert(name, h, owner, VarBody::Marker(site))
    }

    fn insert(&mut self, name: &str, h: u32, owner: Option<LibId>, body: VarBody) -> VarId {
        let id = self.arena.len();
        let head = match owner {
            Some(lib) => &mut self.libs[lib][h as usize % BUCKETS],
            None => &mut self.main[h as usize % BUCKETS],
        };
        let next = head.replace(id);
        self.arena.push(Var {
            name: name.into(),
            hash: h,
            owner,
            next,
            body,
        });
        id
    }
}
