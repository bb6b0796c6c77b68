mod page_symbols;
