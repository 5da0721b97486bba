/// ## Runtime and tokenizer errors
///
/// Every failure the interpreter can report is a numbered error in the
/// Basic V tradition. An `Error` optionally carries the line number it
/// occurred on and a detail string (a variable or procedure name, the
/// text of an `ERROR` statement, and so on).

#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    code: u16,
    line: Option<u16>,
    detail: Option<String>,
    /// Raised by the ERROR statement: the detail is the whole message.
    custom: bool,
}

macro_rules! error {
    ($err:ident) => {
        $crate::lang::error::Error::from_code($crate::lang::error::ErrorCode::$err)
    };
    ($err:ident; $detail:expr) => {
        $crate::lang::error::Error::from_code($crate::lang::error::ErrorCode::$err)
            .with_detail($detail)
    };
}

impl Error {
    pub fn from_code(code: ErrorCode) -> Error {
        Error {
            code: code as u16,
            line: None,
            detail: None,
            custom: false,
        }
    }

    /// The `ERROR n, "text"` statement raises arbitrary numbers.
    pub fn custom(number: u16, text: &str) -> Error {
        Error {
            code: number,
            line: None,
            detail: Some(text.to_string()),
            custom: true,
        }
    }

    pub fn with_detail<T: Into<String>>(mut self, detail: T) -> Error {
        self.detail = Some(detail.into());
        self
    }

    pub fn in_line(mut self, line: Option<u16>) -> Error {
        if self.line.is_none() {
            self.line = line;
        }
        self
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn line(&self) -> Option<u16> {
        self.line
    }

    pub fn is(&self, code: ErrorCode) -> bool {
        self.code == code as u16
    }

    /// Engine invariant violations are reported but never handed to an
    /// `ON ERROR` handler.
    pub fn is_fatal(&self) -> bool {
        self.code == ErrorCode::Broken as u16
    }

    /// The message without the line number, as `REPORT$` returns it.
    /// A broken-engine error parenthesizes the component that raised
    /// it.
    pub fn message(&self) -> String {
        let base = if self.custom {
            ""
        } else {
            match ErrorCode::from_number(self.code) {
                Some(code) => code.text(),
                None => "",
            }
        };
        if self.is_fatal() && !self.custom {
            return match &self.detail {
                Some(component) => format!("{} ({})", base, component),
                None => base.to_string(),
            };
        }
        match &self.detail {
            None => base.to_string(),
            Some(detail) if base.is_empty() => detail.clone(),
            Some(detail) => format!("{} {}", base, detail),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.is_fatal() && !self.custom {
            // "The interpreter has gone wrong at line N (component)".
            // Without a line (a direct command) the component alone
            // follows the message.
            let base = ErrorCode::Broken.text();
            return match (self.line, &self.detail) {
                (Some(line), Some(component)) => {
                    write!(f, "{} at line {} ({})", base, line, component)
                }
                (Some(line), None) => write!(f, "{} at line {}", base, line),
                (None, Some(component)) => write!(f, "{} ({})", base, component),
                (None, None) => write!(f, "{}", base),
            };
        }
        match self.line {
            Some(line) => write!(f, "{} at line {}", self.message(), line),
            None => write!(f, "{}", self.message()),
        }
    }
}

/// Error numbers follow the Acorn interpreter where it assigned one and
/// fill the gaps where it did not.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ErrorCode {
    Silly = 0,
    OutOfRange = 1,
    BadHimem = 2,
    NegativeDim = 3,
    Mistake = 4,
    MissingComma = 5,
    TypeMismatch = 6,
    NotInFunction = 7,
    MissingQuote = 9,
    BadDim = 10,
    DimSpace = 11,
    NotLocal = 12,
    NotInProcedure = 13,
    ArrayMissing = 14,
    Subscript = 15,
    Syntax = 16,
    Escape = 17,
    DivideByZero = 18,
    StringTooLong = 19,
    TooBig = 20,
    NegativeRoot = 21,
    LogRange = 22,
    NoSuchVariable = 26,
    MissingRParen = 27,
    BadConstant = 28,
    NoSuchProc = 29,
    BadCall = 30,
    Arguments = 31,
    NoFor = 32,
    CantMatchFor = 33,
    ForVariable = 34,
    MissingTo = 35,
    NoGosub = 36,
    MissingEq = 37,
    MissingLParen = 38,
    MissingOf = 39,
    OnRange = 40,
    NoSuchLine = 41,
    OutOfData = 42,
    NoRepeat = 43,
    NoWhile = 46,
    MissingEndcase = 47,
    MissingEndwhile = 48,
    MissingEndif = 49,
    NoLibrary = 54,
    BadLibrary = 55,
    StackFull = 84,
    Unsupported = 88,
    Broken = 96,
    Stop = 249,
    CommandFailed = 254,
}

impl ErrorCode {
    fn text(self) -> &'static str {
        use ErrorCode::*;
        match self {
            Silly => "Silly",
            OutOfRange => "Number is out of range",
            BadHimem => "Bad HIMEM",
            NegativeDim => "Array dimension is negative",
            Mistake => "Mistake",
            MissingComma => "Missing ,",
            TypeMismatch => "Type mismatch",
            NotInFunction => "Not in a function",
            MissingQuote => "Missing \"",
            BadDim => "Bad DIM",
            DimSpace => "DIM space",
            NotLocal => "Not LOCAL",
            NotInProcedure => "Not in a procedure",
            ArrayMissing => "Unknown array",
            Subscript => "Subscript out of range",
            Syntax => "Syntax error",
            Escape => "Escape",
            DivideByZero => "Division by zero",
            StringTooLong => "String too long",
            TooBig => "Number too big",
            NegativeRoot => "Negative root",
            LogRange => "Logarithm range",
            NoSuchVariable => "No such variable",
            MissingRParen => "Missing )",
            BadConstant => "Bad constant",
            NoSuchProc => "No such FN/PROC",
            BadCall => "Bad call",
            Arguments => "Arguments",
            NoFor => "Not in a FOR loop",
            CantMatchFor => "Can't match FOR",
            ForVariable => "Bad FOR control variable",
            MissingTo => "Missing TO",
            NoGosub => "Not in a subroutine",
            MissingEq => "Missing =",
            MissingLParen => "Missing (",
            MissingOf => "Missing OF",
            OnRange => "ON range",
            NoSuchLine => "No such line",
            OutOfData => "Out of data",
            NoRepeat => "Not in a REPEAT loop",
            NoWhile => "Not in a WHILE loop",
            MissingEndcase => "Missing ENDCASE",
            MissingEndwhile => "Missing ENDWHILE",
            MissingEndif => "Missing ENDIF",
            NoLibrary => "Cannot find library",
            BadLibrary => "Bad library",
            StackFull => "Stack full",
            Unsupported => "Unsupported statement",
            Broken => "The interpreter has gone wrong",
            Stop => "STOP",
            CommandFailed => "Bad command",
        }
    }

    fn from_number(number: u16) -> Option<ErrorCode> {
        use ErrorCode::*;
        const ALL: [ErrorCode; 51] = [
            Silly,
            OutOfRange,
            BadHimem,
            NegativeDim,
            Mistake,
            MissingComma,
            TypeMismatch,
            NotInFunction,
            MissingQuote,
            BadDim,
            DimSpace,
            NotLocal,
            NotInProcedure,
            ArrayMissing,
            Subscript,
            Syntax,
            Escape,
            DivideByZero,
            StringTooLong,
            TooBig,
            NegativeRoot,
            LogRange,
            NoSuchVariable,
            MissingRParen,
            BadConstant,
            NoSuchProc,
            BadCall,
            Arguments,
            NoFor,
            CantMatchFor,
            ForVariable,
            MissingTo,
            NoGosub,
            MissingEq,
            MissingLParen,
            MissingOf,
            OnRange,
            NoSuchLine,
            OutOfData,
            NoRepeat,
            NoWhile,
            MissingEndcase,
            MissingEndwhile,
            MissingEndif,
            NoLibrary,
            BadLibrary,
            StackFull,
            Unsupported,
            Broken,
            Stop,
            CommandFailed,
        ];
        ALL.iter().find(|code| **code as u16 == number).copied()
    }
}
