use super::program::CaseTable;
use super::val::Value;
use super::var::{ParmSlot, Parm, ProcDef, VarBody, VarId};
use super::Runtime;
use crate::lang::{Error, Token, Word};
use std::rc::Rc;

type Result<T> = std::result::Result<T, Error>;

/// Sentinel for a block IF whose false-branch target has not been
/// located yet; a true condition never pays for the scan.
const UNPLACED: usize = usize::MAX;

/// ## Token stream resolver
///
/// Each unresolved token is rewritten into its resolved form the first
/// time the cursor lands on it: line-number operands get token
/// addresses, call sites get symbol records, block IFs get branch
/// targets, ELSE/WHEN/OTHERWISE get skip targets, and CASE gets a jump
/// table. Every rewrite is observationally idempotent: running the
/// resolved form takes the same branches the scan took.

impl Runtime {
    // ----- line-number references -----

    /// A GOTO/GOSUB/RESTORE operand: a resolved address, a number to
    /// resolve and rewrite, or a computed expression (never cached).
    pub(crate) fn line_operand(&mut self) -> Result<usize> {
        match self.tok() {
            Token::LineAddr(addr) => {
                self.cursor += 1;
                Ok(addr)
            }
            Token::LineNum(number) => {
                let site = self.cursor;
                let index = self
                    .program
                    .find_line(number)
                    .map_err(|e| e.with_detail(number.to_string()))?;
                let target = self.program.line(index).start;
                self.program.set_token(site, Token::LineAddr(target));
                self.cursor += 1;
                Ok(target)
            }
            _ => {
                let number = self.eval_any_int()?;
                if number < 0 || number > crate::lang::MAX_LINE as i64 {
                    return Err(error!(OutOfRange));
                }
                let index = self
                    .program
                    .find_line(number as u16)
                    .map_err(|e| e.with_detail(number.to_string()))?;
                Ok(self.program.line(index).start)
            }
        }
    }

    // ----- IF -----

    /// First execution of an IF: decide single-line or block by whether
    /// THEN ends the line, rewrite, and run the resolved form.
    pub(crate) fn resolve_if(&mut self) -> Result<()> {
        let eol = self.eol_addr_from(self.cursor);
        // "Block start" means any THEN immediately before end-of-line,
        // matching the forward scans.
        let mut then_at_eol = None;
        for addr in self.cursor + 1..eol {
            if matches!(self.program.token(addr), Token::Word(Word::Then)) && addr + 1 == eol {
                then_at_eol = Some(addr);
            }
        }
        match then_at_eol {
            Some(_) => {
                self.program
                    .set_token(self.cursor, Token::BlockIf(eol + 1, UNPLACED));
                self.block_if(eol + 1, UNPLACED)
            }
            None if self.cascade_if() && self.line_has_then(eol) => {
                // Cascade mode: THEN with trailing source still opens a
                // block, which pairs with an ENDIF only.
                let then_addr = self.then_addr(eol)?;
                self.program
                    .set_token(self.cursor, Token::BlockIf(then_addr + 1, UNPLACED));
                self.block_if(then_addr + 1, UNPLACED)
            }
            None => {
                self.program.set_token(self.cursor, Token::SingleIf);
                self.single_if()
            }
        }
    }

    fn line_has_then(&self, eol: usize) -> bool {
        (self.cursor + 1..eol)
            .any(|addr| matches!(self.program.token(addr), Token::Word(Word::Then)))
    }

    fn then_addr(&self, eol: usize) -> Result<usize> {
        (self.cursor + 1..eol)
            .find(|addr| matches!(self.program.token(*addr), Token::Word(Word::Then)))
            .ok_or_else(|| error!(Syntax))
    }

    pub(crate) fn single_if(&mut self) -> Result<()> {
        self.cursor += 1;
        let taken = self.expression()?.any_num64()? != 0;
        if matches!(self.tok(), Token::Word(Word::Then)) {
            self.cursor += 1;
        }
        if taken {
            if matches!(self.tok(), Token::LineNum(_) | Token::LineAddr(_)) {
                let target = self.line_operand()?;
                self.cursor = target;
            }
            return Ok(());
        }
        // False: pass control to the first ELSE on the line, or to the
        // next line.
        let eol = self.eol_addr_from(self.cursor);
        for addr in self.cursor..eol {
            if matches!(self.program.token(addr), Token::Else | Token::ElseJump(_)) {
                self.cursor = addr + 1;
                if matches!(self.tok(), Token::LineNum(_) | Token::LineAddr(_)) {
                    let target = self.line_operand()?;
                    self.cursor = target;
                }
                return Ok(());
            }
        }
        self.cursor = eol;
        Ok(())
    }

    pub(crate) fn block_if(&mut self, then_at: usize, else_at: usize) -> Result<()> {
        let site = self.cursor;
        self.cursor += 1;
        let taken = self.expression()?.any_num64()? != 0;
        if taken {
            self.cursor = then_at;
            return Ok(());
        }
        let else_at = if else_at == UNPLACED {
            let located = self.locate_block_else(site)?;
            self.program.set_token(site, Token::BlockIf(then_at, located));
            located
        } else {
            else_at
        };
        self.cursor = else_at;
        Ok(())
    }

    /// Forward scan for the false branch of a block IF: a depth-1 ELSE
    /// at the start of a line, otherwise the statement after the paired
    /// ENDIF. Cascade mode only accepts the ENDIF.
    fn locate_block_else(&mut self, if_addr: usize) -> Result<usize> {
        let want_else = !self.cascade_if();
        self.scan_if_lines(if_addr, want_else, 1)
    }

    /// Executed ELSE: the end of a THEN arm. A line-leading ELSE closes
    /// a block arm and pairs with an ENDIF; any other ELSE belongs to a
    /// single-line IF and skips to the next line.
    pub(crate) fn resolve_else(&mut self) -> Result<()> {
        let site = self.cursor;
        let target = if self.line_leads_with(site) {
            // An `ELSE IF ... THEN` line opens a nested block of its
            // own, so it needs one more ENDIF.
            let eol = self.eol_addr_from(site);
            let depth = if eol > site + 1
                && matches!(self.program.token(eol - 1), Token::Word(Word::Then))
            {
                2
            } else {
                1
            };
            self.scan_if_lines(site, false, depth)?
        } else {
            self.eol_addr_from(site) + 1
        };
        self.program.set_token(site, Token::ElseJump(target));
        self.cursor = target;
        Ok(())
    }

    fn line_leads_with(&self, addr: usize) -> bool {
        match self.program.line_index_of(addr) {
            Some(index) => self.program.line(index).start == addr,
            None => false,
        }
    }

    /// Shared line-wise scan below an IF (or a block ELSE). When
    /// `want_else` is set a depth-1 line-leading ELSE succeeds with the
    /// address after it; either way a depth-0 ENDIF succeeds with the
    /// address after it. Nesting counts every line that ends in THEN.
    fn scan_if_lines(&self, from_addr: usize, want_else: bool, depth: usize) -> Result<usize> {
        let (mut index, limit) = self.segment_lines_after(from_addr)?;
        let mut depth = depth;
        while index < limit {
            let span = self.program.line(index).clone();
            let first = self.program.token(span.start);
            if matches!(first, Token::Word(Word::Endif)) {
                depth -= 1;
                if depth == 0 {
                    return Ok(span.start + 1);
                }
            } else if want_else
                && depth == 1
                && matches!(first, Token::Else | Token::ElseJump(_))
            {
                return Ok(span.start + 1);
            }
            if span.end > span.start
                && matches!(self.program.token(span.end - 1), Token::Word(Word::Then))
            {
                depth += 1;
            }
            index += 1;
        }
        Err(error!(MissingEndif))
    }

    /// The lines following the one containing `addr`, bounded by the
    /// end of its segment (main program or library).
    fn segment_lines_after(&self, addr: usize) -> Result<(usize, usize)> {
        let index = match self.program.line_index_of(addr) {
            Some(index) => index,
            // Direct mode: block structure cannot continue past the
            // command line.
            None => return Err(error!(MissingEndif)),
        };
        let limit = match self
            .program
            .libraries()
            .iter()
            .find(|lib| index >= lib.first && index <= lib.last)
        {
            Some(lib) => lib.last + 1,
            None => self.program.main_lines(),
        };
        Ok((index + 1, limit))
    }

    /// Address of the Eol/EndProg closing the statement run containing
    /// `from` (scanning forward through the flat stream).
    pub(crate) fn eol_addr_from(&self, from: usize) -> usize {
        let mut addr = from;
        loop {
            match self.program.token(addr) {
                Token::Eol | Token::EndProg => return addr,
                _ => addr += 1,
            }
        }
    }

    // ----- CASE -----

    /// First execution of a CASE: walk forward to the paired ENDCASE
    /// collecting depth-1 WHEN and OTHERWISE clauses into a table, then
    /// run the resolved form.
    pub(crate) fn resolve_case(&mut self) -> Result<()> {
        let site = self.cursor;
        let mut whens = Vec::new();
        let mut default = None;
        let mut depth = 1usize;
        let mut addr = site + 1;
        loop {
            match self.program.token(addr) {
                Token::EndProg => return Err(error!(MissingEndcase)),
                Token::Case | Token::CaseTable(_) => depth += 1,
                Token::Word(Word::Endcase) => {
                    depth -= 1;
                    if depth == 0 {
                        if default.is_none() {
                            default = Some(addr + 1);
                        }
                        break;
                    }
                }
                Token::When | Token::WhenJump(_) if depth == 1 => {
                    whens.push((addr + 1, self.clause_body(addr + 1)));
                }
                Token::Otherwise | Token::OtherwiseJump(_) if depth == 1 => {
                    default = Some(self.clause_body(addr + 1));
                }
                _ => {}
            }
            addr += 1;
        }
        let table = self.program.push_case_table(CaseTable {
            whens,
            default: default.unwrap_or_else(|| unreachable!()),
        });
        self.program.set_token(site, Token::CaseTable(table));
        self.case_statement(table)
    }

    /// First statement of a WHEN/OTHERWISE body: past the expression
    /// list and its closing ':', or the start of the next line.
    fn clause_body(&self, from: usize) -> usize {
        let mut addr = from;
        loop {
            match self.program.token(addr) {
                Token::Colon => return addr + 1,
                Token::Eol => return addr + 1,
                Token::EndProg => return addr,
                _ => addr += 1,
            }
        }
    }

    pub(crate) fn case_statement(&mut self, table: usize) -> Result<()> {
        self.cursor += 1;
        let selector = self.expression()?;
        if !matches!(self.tok(), Token::Word(Word::Of)) {
            return Err(error!(MissingOf));
        }
        self.cursor += 1;
        let whens = self.program.case_tables[table].whens.clone();
        let default = self.program.case_tables[table].default;
        for (expr_addr, body_addr) in whens {
            self.cursor = expr_addr;
            loop {
                let case = self.expression()?;
                if Runtime::case_match(&selector, case)? {
                    self.cursor = body_addr;
                    return Ok(());
                }
                match self.tok() {
                    Token::Comma => self.cursor += 1,
                    token if token.at_eos() => break,
                    _ => return Err(error!(Syntax)),
                }
            }
        }
        self.cursor = default;
        Ok(())
    }

    /// CASE comparison: integers by value, floats promoted, strings
    /// byte-equal, and never across the numeric/string divide.
    fn case_match(selector: &Value, case: Value) -> Result<bool> {
        match selector {
            Value::Str(s) => match case {
                Value::Str(w) => Ok(*s == w),
                _ => Err(error!(TypeMismatch)),
            },
            Value::Float(f) => Ok(*f == case.any_num_f64()?),
            _ => match case {
                Value::Float(w) => Ok(selector.clone().any_num_f64()? == w),
                Value::Str(_) | Value::Array(_) => Err(error!(TypeMismatch)),
                w => Ok(selector.clone().any_int()? == w.any_int()?),
            },
        }
    }

    /// A WHEN/OTHERWISE reached in normal flow ends the previous body:
    /// skip to the paired ENDCASE and cache the jump in the token.
    pub(crate) fn resolve_when_skip(&mut self) -> Result<()> {
        let site = self.cursor;
        let mut depth = 1usize;
        let mut addr = site + 1;
        loop {
            match self.program.token(addr) {
                Token::EndProg => return Err(error!(MissingEndcase)),
                Token::Case | Token::CaseTable(_) => depth += 1,
                Token::Word(Word::Endcase) => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
            addr += 1;
        }
        let resolved = match self.program.token(site) {
            Token::When => Token::WhenJump(addr),
            _ => Token::OtherwiseJump(addr),
        };
        self.program.set_token(site, resolved);
        self.cursor = addr;
        Ok(())
    }

    // ----- WHILE exits -----

    /// Address after the ENDWHILE pairing the WHILE at `while_addr`,
    /// cached after the first scan.
    pub(crate) fn find_endwhile(&mut self, while_addr: usize) -> Result<usize> {
        if let Some(exit) = self.program.while_exits.get(&while_addr) {
            return Ok(*exit);
        }
        let mut depth = 1usize;
        let mut addr = while_addr + 1;
        loop {
            match self.program.token(addr) {
                Token::EndProg => return Err(error!(MissingEndwhile)),
                Token::Word(Word::While) => depth += 1,
                Token::Word(Word::Endwhile) => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
            addr += 1;
        }
        self.program.while_exits.insert(while_addr, addr + 1);
        Ok(addr + 1)
    }

    // ----- PROC/FN definitions -----

    /// Find (or discover) the record for a PROC/FN name. New marker
    /// entries are dropped for every definition passed on the way; the
    /// scan resumes where the previous one stopped, then falls back to
    /// the libraries.
    pub(crate) fn resolve_fnproc(&mut self, name: &Rc<str>) -> Result<VarId> {
        if let Some(id) = self.vars.find(name, None) {
            if matches!(self.vars.get(id).body, VarBody::Marker(_)) {
                self.scan_parmlist(id)?;
            }
            if matches!(self.vars.get(id).body, VarBody::Proc(_)) {
                return Ok(id);
            }
        }
        let mut index = self.program.last_search;
        let mut found = None;
        while index < self.program.main_lines() {
            let span = self.program.line(index).clone();
            index += 1;
            if let (Token::Word(Word::Def), Token::Call(def_name)) = (
                self.program.token(span.start).clone(),
                self.program.token(span.start + 1).clone(),
            ) {
                let id = match self.vars.find(&def_name, None) {
                    Some(id) => id,
                    None => self.vars.create_marker(&def_name, span.start + 1, None),
                };
                if *def_name == **name {
                    found = Some(id);
                    break;
                }
            }
        }
        self.program.last_search = index;
        if found.is_none() {
            for at in 0..self.program.libraries().len() {
                self.scan_one_library(at)?;
                if let Some(id) = self.vars.find(name, None) {
                    found = Some(id);
                    break;
                }
            }
        }
        match found {
            Some(id) => {
                if matches!(self.vars.get(id).body, VarBody::Marker(_)) {
                    self.scan_parmlist(id)?;
                }
                Ok(id)
            }
            None => {
                let bare = name.trim_start_matches("PROC").trim_start_matches("FN");
                Err(error!(NoSuchProc; bare))
            }
        }
    }

    /// Upgrade a marker to a full record by parsing the definition's
    /// parameter list once.
    fn scan_parmlist(&mut self, id: VarId) -> Result<()> {
        let site = match self.vars.get(id).body {
            VarBody::Marker(site) => site,
            _ => return Err(error!(Broken; "resolve")),
        };
        let saved = self.cursor;
        self.cursor = site + 1;
        let mut parms = Vec::new();
        if matches!(self.tok(), Token::LParen) {
            self.cursor += 1;
            loop {
                let is_return = if matches!(self.tok(), Token::Word(Word::Return)) {
                    self.cursor += 1;
                    true
                } else {
                    false
                };
                let slot = match self.tok() {
                    Token::Static(slot) => {
                        self.cursor += 1;
                        ParmSlot::Static(slot)
                    }
                    Token::Var(formal) => {
                        self.cursor += 1;
                        if formal.ends_with('(') {
                            if !matches!(self.tok(), Token::RParen) {
                                self.cursor = saved;
                                return Err(error!(MissingRParen));
                            }
                            self.cursor += 1;
                        }
                        ParmSlot::Var(formal)
                    }
                    _ => {
                        self.cursor = saved;
                        return Err(error!(Syntax));
                    }
                };
                parms.push(Parm { slot, is_return });
                match self.tok() {
                    Token::Comma => self.cursor += 1,
                    Token::RParen => {
                        self.cursor += 1;
                        break;
                    }
                    _ => {
                        self.cursor = saved;
                        return Err(error!(MissingRParen));
                    }
                }
            }
        }
        if matches!(self.tok(), Token::Colon) {
            self.cursor += 1;
        }
        while matches!(self.tok(), Token::Eol) {
            self.cursor += 1;
        }
        if matches!(self.tok(), Token::EndProg) {
            self.cursor = saved;
            return Err(error!(Syntax));
        }
        let entry = self.cursor;
        self.cursor = saved;
        let simple = parms.len() == 1 && !parms[0].is_return && parms[0].is_plain_int();
        self.vars.get_mut(id).body = VarBody::Proc(ProcDef {
            entry,
            parms,
            simple,
        });
        Ok(())
    }

    /// First search of a library: note every DEF, create the variables
    /// of a leading `LIBRARY LOCAL`, and process leading `DIM` lines.
    fn scan_one_library(&mut self, at: usize) -> Result<()> {
        let (first, last, lib) = {
            let library = &self.program.libraries()[at];
            if library.scanned {
                return Ok(());
            }
            (library.first, library.last, library.lib)
        };
        let mut found_def = false;
        for index in first..=last {
            let span = self.program.line(index).clone();
            let head = self.program.token(span.start).clone();
            if let (Token::Word(Word::Def), Token::Call(def_name)) =
                (&head, self.program.token(span.start + 1).clone())
            {
                found_def = true;
                if self.vars.find(&def_name, None).is_none() {
                    self.vars.create_marker(&def_name, span.start + 1, None);
                }
                continue;
            }
            if found_def {
                continue;
            }
            match head {
                Token::Word(Word::Library)
                    if matches!(
                        self.program.token(span.start + 1),
                        Token::Word(Word::Local)
                    ) =>
                {
                    self.library_locals(span.start + 2, span.end, lib);
                }
                Token::Word(Word::Dim) => {
                    let saved = self.cursor;
                    self.cursor = span.start;
                    let outcome = self.statement(Word::Dim);
                    self.cursor = saved;
                    outcome?;
                }
                _ => {}
            }
        }
        self.program.library_mut(at).scanned = true;
        Ok(())
    }

    fn library_locals(&mut self, from: usize, to: usize, lib: usize) {
        for addr in from..to {
            if let Token::Var(name) = self.program.token(addr).clone() {
                let private = match self.vars.find(&name, Some(lib)) {
                    Some(id) => self.vars.get(id).owner == Some(lib),
                    None => false,
                };
                if !private {
                    self.vars.create(&name, Some(lib));
                }
            }
        }
    }
}

impl Parm {
    fn is_plain_int(&self) -> bool {
        match &self.slot {
            ParmSlot::Static(_) => true,
            ParmSlot::Var(name) => {
                matches!(
                    super::var::name_type(name),
                    (super::var::ElemType::Int, false)
                )
            }
        }
    }
}
