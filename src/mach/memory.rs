use crate::lang::Error;

type Result<T> = std::result::Result<T, Error>;

const DEFAULT_SIZE: usize = 512 * 1024;
const PAGE: usize = 0x0E00;

/// ## Byte window
///
/// A flat byte array standing in for the Basic workspace. The
/// indirection operators `?`, `!`, `]`, `|` and `$` translate directly
/// to these accessors: all integer accesses are little-endian and
/// unaligned, floats copy eight bytes, and `$` strings terminate at a
/// carriage return.
///
/// `DIM v n` blocks come from the low side (`lomem` upward); off-heap
/// `DIM HIMEM` blocks come from the top downward and leak unless
/// released with a size of -1 or `CLEAR HIMEM`.

#[derive(Debug)]
pub struct Memory {
    bytes: Vec<u8>,
    lomem: usize,
    vartop: usize,
    himem: usize,
    offheap: Vec<Block>,
}

#[derive(Debug)]
struct Block {
    base: usize,
    live: bool,
}

impl Memory {
    pub fn new() -> Memory {
        Memory {
            bytes: vec![0; DEFAULT_SIZE],
            lomem: PAGE,
            vartop: PAGE,
            himem: DEFAULT_SIZE,
            offheap: Vec::new(),
        }
    }

    pub fn page(&self) -> usize {
        PAGE
    }

    pub fn lomem(&self) -> usize {
        self.lomem
    }

    pub fn himem(&self) -> usize {
        self.himem
    }

    pub fn vartop(&self) -> usize {
        self.vartop
    }

    pub fn set_himem(&mut self, himem: usize) -> Result<()> {
        if himem <= self.vartop || himem > self.bytes.len() {
            return Err(error!(BadHimem));
        }
        self.himem = himem;
        Ok(())
    }

    pub fn set_lomem(&mut self, lomem: usize) -> Result<()> {
        if lomem < PAGE || lomem >= self.himem {
            return Err(error!(BadHimem));
        }
        self.lomem = lomem;
        self.vartop = lomem;
        Ok(())
    }

    /// Discard all `DIM v n` blocks (RUN and CLEAR). Off-heap blocks
    /// survive; their reclamation is explicit by contract.
    pub fn reset(&mut self) {
        self.vartop = self.lomem;
    }

    fn check(&self, offset: usize, len: usize) -> Result<()> {
        if offset.checked_add(len).map_or(true, |end| end > self.bytes.len()) {
            Err(error!(OutOfRange))
        } else {
            Ok(())
        }
    }

    pub fn read_u8(&self, offset: usize) -> Result<u8> {
        self.check(offset, 1)?;
        Ok(self.bytes[offset])
    }

    pub fn write_u8(&mut self, offset: usize, value: u8) -> Result<()> {
        self.check(offset, 1)?;
        self.bytes[offset] = value;
        Ok(())
    }

    pub fn read_i32(&self, offset: usize) -> Result<i32> {
        self.check(offset, 4)?;
        let mut raw = [0; 4];
        raw.copy_from_slice(&self.bytes[offset..offset + 4]);
        Ok(i32::from_le_bytes(raw))
    }

    pub fn write_i32(&mut self, offset: usize, value: i32) -> Result<()> {
        self.check(offset, 4)?;
        self.bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    pub fn read_i64(&self, offset: usize) -> Result<i64> {
        self.check(offset, 8)?;
        let mut raw = [0; 8];
        raw.copy_from_slice(&self.bytes[offset..offset + 8]);
        Ok(i64::from_le_bytes(raw))
    }

    pub fn write_i64(&mut self, offset: usize, value: i64) -> Result<()> {
        self.check(offset, 8)?;
        self.bytes[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    pub fn read_f64(&self, offset: usize) -> Result<f64> {
        Ok(f64::from_bits(self.read_i64(offset)? as u64))
    }

    pub fn write_f64(&mut self, offset: usize, value: f64) -> Result<()> {
        self.write_i64(offset, value.to_bits() as i64)
    }

    /// Length of the CR-terminated string at `offset`.
    pub fn cstring_len(&self, offset: usize) -> Result<usize> {
        let mut end = offset;
        loop {
            if self.read_u8(end)? == b'\r' {
                return Ok(end - offset);
            }
            end += 1;
        }
    }

    pub fn read_string(&self, offset: usize) -> Result<String> {
        let len = self.cstring_len(offset)?;
        Ok(String::from_utf8_lossy(&self.bytes[offset..offset + len]).into_owned())
    }

    pub fn write_string(&mut self, offset: usize, s: &str) -> Result<()> {
        self.check(offset, s.len() + 1)?;
        self.bytes[offset..offset + s.len()].copy_from_slice(s.as_bytes());
        self.bytes[offset + s.len()] = b'\r';
        Ok(())
    }

    /// A `DIM v n` block of n+1 bytes; `DIM v -1` is a valid zero-length
    /// allocation.
    pub fn alloc(&mut self, size: i64) -> Result<usize> {
        if size < -1 {
            return Err(error!(NegativeDim));
        }
        let bytes = (size + 1) as usize;
        if self.vartop + bytes > self.himem {
            return Err(error!(DimSpace));
        }
        let base = self.vartop;
        self.vartop += bytes;
        Ok(base)
    }

    pub fn alloc_himem(&mut self, size: i64) -> Result<usize> {
        if size < 0 {
            return Err(error!(NegativeDim));
        }
        let bytes = (size + 1) as usize;
        let floor = self
            .offheap
            .iter()
            .filter(|block| block.live)
            .map(|block| block.base)
            .min()
            .unwrap_or(self.bytes.len());
        if floor < bytes || floor - bytes < self.himem {
            return Err(error!(DimSpace));
        }
        let base = floor - bytes;
        self.offheap.push(Block { base, live: true });
        Ok(base)
    }

    /// Release the off-heap block starting at `base`.
    pub fn free_himem(&mut self, base: usize) -> Result<()> {
        match self.offheap.iter_mut().find(|b| b.live && b.base == base) {
            Some(block) => {
                block.live = false;
                Ok(())
            }
            None => Err(error!(BadHimem)),
        }
    }

    pub fn clear_himem(&mut self) {
        self.offheap.clear();
    }
}
